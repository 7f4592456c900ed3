use super::*;
use crate::acquirer::FrameAcquirer;
use crate::barcode::{BarcodeDecoder, ScriptedBarcodeDecoder};
use crate::bitmap::{BitmapDecoder, RawBitmapDecoder};
use crate::camera::{ScriptStep, ScriptedCamera};
use crate::config::ScanConfig;
use crate::error::{BarcamError, FrameError, SessionError};
use crate::frame::{AlphaMode, ColorFormat, PixelLayout};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn scan_config(max_attempts: u32) -> ScanConfig {
    ScanConfig {
        startup_delay_ms: 0,
        frame_timeout_ms: 1000,
        max_attempts,
        continuous_focus: true,
    }
}

fn pixel() -> Vec<u8> {
    vec![0x40, 0x80, 0xC0, 0xFF]
}

async fn acquirer_for(camera: &ScriptedCamera, layout: PixelLayout) -> FrameAcquirer {
    let bitmap: Arc<dyn BitmapDecoder> =
        Arc::new(RawBitmapDecoder::new(layout, AlphaMode::Straight));
    FrameAcquirer::open(camera, bitmap, &scan_config(0)).await.unwrap()
}

#[test]
fn test_state_transitions() {
    use ScanState::*;

    assert!(Idle.can_transition_to(Sampling));
    assert!(Sampling.can_transition_to(Decoding));
    assert!(Decoding.can_transition_to(Sampling));
    assert!(Decoding.can_transition_to(Succeeded));
    assert!(Decoding.can_transition_to(Cancelled));
    assert!(Sampling.can_transition_to(Failed));

    assert!(!Idle.can_transition_to(Decoding));
    assert!(!Sampling.can_transition_to(Succeeded));
    assert!(!Sampling.can_transition_to(Cancelled));
    assert!(!Succeeded.can_transition_to(Sampling));
    assert!(!Failed.can_transition_to(Sampling));

    assert!(Succeeded.is_terminal());
    assert!(Cancelled.is_terminal());
    assert!(Failed.is_terminal());
    assert!(!Decoding.is_terminal());
}

#[test]
fn test_scan_result_into_result() {
    assert_eq!(
        ScanResult::Decoded("X".to_string()).into_result().unwrap(),
        Some("X".to_string())
    );
    assert_eq!(ScanResult::Cancelled.into_result().unwrap(), None);
    assert!(ScanResult::Failed(BarcamError::system("boom"))
        .into_result()
        .is_err());
}

#[tokio::test]
async fn test_succeeds_on_nth_attempt_with_exactly_n_cycles() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let stats = camera.stats();
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder = Arc::new(ScriptedBarcodeDecoder::on_attempt(5, "HELLO"));

    let mut scan = ScanLoop::new(&scan_config(0));
    let result = scan
        .run(
            &mut acquirer,
            Arc::clone(&decoder) as Arc<dyn BarcodeDecoder>,
            &CancellationToken::new(),
        )
        .await;

    match result {
        ScanResult::Decoded(text) => assert_eq!(text, "HELLO"),
        other => panic!("Expected Decoded, got {:?}", other),
    }
    assert_eq!(scan.attempts(), 5);
    assert_eq!(decoder.attempts(), 5);
    assert_eq!(stats.grabs(), 5);
    assert_eq!(acquirer.samples(), 5);
    assert_eq!(scan.state(), ScanState::Succeeded);
}

#[tokio::test]
async fn test_history_follows_state_machine() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(ScriptedBarcodeDecoder::on_attempt(2, "X"));

    let mut scan = ScanLoop::new(&scan_config(0));
    scan.run(&mut acquirer, decoder, &CancellationToken::new()).await;

    use ScanState::*;
    assert_eq!(
        scan.history(),
        &[Idle, Sampling, Decoding, Sampling, Decoding, Succeeded]
    );
}

#[tokio::test]
async fn test_cancelled_before_any_match_ends_cancelled() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder = Arc::new(ScriptedBarcodeDecoder::never());

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut scan = ScanLoop::new(&scan_config(0));
    let result = scan
        .run(
            &mut acquirer,
            Arc::clone(&decoder) as Arc<dyn BarcodeDecoder>,
            &cancel,
        )
        .await;

    assert!(result.is_cancelled());
    // The pending tick still gets its decode attempt
    assert_eq!(decoder.attempts(), 1);
    assert_eq!(scan.state(), ScanState::Cancelled);
}

#[tokio::test]
async fn test_match_wins_over_pending_cancel() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(ScriptedBarcodeDecoder::on_attempt(1, "FIRST"));

    let cancel = CancellationToken::new();
    cancel.cancel();

    let mut scan = ScanLoop::new(&scan_config(0));
    let result = scan.run(&mut acquirer, decoder, &cancel).await;

    assert_eq!(result.into_result().unwrap(), Some("FIRST".to_string()));
}

#[tokio::test]
async fn test_empty_text_is_not_a_match() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(ScriptedBarcodeDecoder::new(vec![
        Some(String::new()),
        Some("REAL".to_string()),
    ]));

    let mut scan = ScanLoop::new(&scan_config(0));
    let result = scan.run(&mut acquirer, decoder, &CancellationToken::new()).await;

    assert_eq!(result.into_result().unwrap(), Some("REAL".to_string()));
    assert_eq!(scan.attempts(), 2);
}

#[tokio::test]
async fn test_attempt_limit_fails_session() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(ScriptedBarcodeDecoder::never());

    let mut scan = ScanLoop::new(&scan_config(3));
    let result = scan.run(&mut acquirer, decoder, &CancellationToken::new()).await;

    match result {
        ScanResult::Failed(BarcamError::Session(SessionError::AttemptsExhausted { attempts })) => {
            assert_eq!(attempts, 3)
        }
        other => panic!("Expected AttemptsExhausted, got {:?}", other),
    }
    assert_eq!(scan.state(), ScanState::Failed);
}

#[tokio::test]
async fn test_unsupported_layout_fails_without_decoding() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let mut acquirer = acquirer_for(&camera, PixelLayout::Nv12).await;
    let decoder = Arc::new(ScriptedBarcodeDecoder::on_attempt(1, "NEVER"));

    let mut scan = ScanLoop::new(&scan_config(0));
    let result = scan
        .run(
            &mut acquirer,
            Arc::clone(&decoder) as Arc<dyn BarcodeDecoder>,
            &CancellationToken::new(),
        )
        .await;

    match result {
        ScanResult::Failed(BarcamError::Frame(FrameError::UnsupportedPixelLayout { layout })) => {
            assert_eq!(layout, PixelLayout::Nv12)
        }
        other => panic!("Expected UnsupportedPixelLayout, got {:?}", other),
    }
    assert_eq!(decoder.attempts(), 0);
}

#[tokio::test]
async fn test_grab_error_fails_session() {
    let camera = ScriptedCamera::new(
        1,
        1,
        vec![
            ScriptStep::Frame(pixel()),
            ScriptStep::GrabError("unplugged".to_string()),
        ],
    );
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(ScriptedBarcodeDecoder::never());

    let mut scan = ScanLoop::new(&scan_config(0));
    let result = scan.run(&mut acquirer, decoder, &CancellationToken::new()).await;

    assert_eq!(result.state(), ScanState::Failed);
    assert_eq!(scan.attempts(), 1);
}

#[tokio::test]
async fn test_decoder_sees_normalized_format() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let bitmap: Arc<dyn BitmapDecoder> = Arc::new(RawBitmapDecoder::new(
        PixelLayout::Bgra8,
        AlphaMode::Premultiplied,
    ));
    let mut acquirer = FrameAcquirer::open(&camera, bitmap, &scan_config(0))
        .await
        .unwrap();
    let decoder = Arc::new(ScriptedBarcodeDecoder::on_attempt(1, "BGR"));

    let mut scan = ScanLoop::new(&scan_config(0));
    scan.run(
        &mut acquirer,
        Arc::clone(&decoder) as Arc<dyn BarcodeDecoder>,
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(decoder.formats(), vec![ColorFormat::Bgr32]);
}

#[tokio::test(start_paused = true)]
async fn test_startup_delay_precedes_first_sample() {
    let camera = ScriptedCamera::repeating(1, 1, pixel());
    let stats = camera.stats();
    let mut acquirer = acquirer_for(&camera, PixelLayout::Rgba8).await;
    let decoder: Arc<dyn BarcodeDecoder> = Arc::new(ScriptedBarcodeDecoder::on_attempt(1, "X"));

    let config = ScanConfig {
        startup_delay_ms: 100,
        ..scan_config(0)
    };
    let started = tokio::time::Instant::now();
    let mut scan = ScanLoop::new(&config);
    let result = scan.run(&mut acquirer, decoder, &CancellationToken::new()).await;

    assert!(result.is_decoded());
    assert!(started.elapsed() >= std::time::Duration::from_millis(100));
    assert_eq!(stats.grabs(), 1);
}
