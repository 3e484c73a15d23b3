//! End-to-end access decisions over a scripted reader.

use latchkey_access::{AccessLoop, AccessLoopConfig, ReadTagService};
use latchkey_core::StaticAuthorizer;
use latchkey_door::NoopDoor;
use latchkey_hardware::mock::ScriptedLink;
use latchkey_hardware::reader::{HardwareReader, ReaderConfig};
use latchkey_hardware::{SharedReader, TagReader};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

async fn wait_for(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn test_loop_recovers_from_irq_and_grants_access() {
    let (opener, handle) = ScriptedLink::new();
    let mut reader = SharedReader::new(HardwareReader::new(opener, ReaderConfig::default()));
    reader.initialize().await.unwrap();

    handle.push_irq();
    handle.push_uid(vec![0xDE, 0xAD, 0xBE, 0xEF]);

    let door = NoopDoor::new();
    let observer = door.clone();
    let config = AccessLoopConfig::new()
        .poll_timeout(Duration::from_millis(50))
        .settle(Duration::from_millis(50));
    let loop_handle = AccessLoop::new(
        reader,
        StaticAuthorizer::new().allow("deadbeef"),
        door,
        config,
    )
    .spawn(CancellationToken::new());

    wait_for(|| observer.ok_count() == 1).await;
    let exit = loop_handle.shutdown().await.unwrap();

    assert_eq!(exit.stats.granted, 1);
    assert_eq!(exit.stats.denied, 0);
    assert_eq!(handle.opens(), 2);
}

#[tokio::test]
async fn test_loop_reopens_reader_after_failed_recovery() {
    let (opener, handle) = ScriptedLink::new();
    let mut reader = SharedReader::new(HardwareReader::new(opener, ReaderConfig::default()));
    reader.initialize().await.unwrap();

    // The reopen after the IRQ fault fails once, leaving no session.
    handle.push_irq();
    handle.fail_next_open("spi busy (transient)");
    handle.push_uid(vec![0xDE, 0xAD, 0xBE, 0xEF]);

    let door = NoopDoor::new();
    let observer = door.clone();
    let config = AccessLoopConfig::new()
        .poll_timeout(Duration::from_millis(50))
        .settle(Duration::from_millis(50))
        .error_backoff(Duration::from_millis(50));
    let loop_handle = AccessLoop::new(
        reader,
        StaticAuthorizer::new().allow("deadbeef"),
        door,
        config,
    )
    .spawn(CancellationToken::new());

    wait_for(|| observer.ok_count() == 1).await;
    let exit = loop_handle.shutdown().await.unwrap();

    assert_eq!(exit.stats.granted, 1);
    assert_eq!(exit.stats.read_errors, 1);
    assert_eq!(handle.opens(), 2);
    assert_eq!(handle.open_sessions(), 1);
}

#[tokio::test]
async fn test_denied_tag_signals_fail() {
    let (opener, handle) = ScriptedLink::new();
    let mut reader = SharedReader::new(HardwareReader::new(opener, ReaderConfig::default()));
    reader.initialize().await.unwrap();
    handle.push_uid(vec![0x0B, 0xAD, 0xF0, 0x0D]);

    let door = NoopDoor::new();
    let observer = door.clone();
    let loop_handle = AccessLoop::new(
        reader,
        StaticAuthorizer::new().deny("0badf00d"),
        door,
        AccessLoopConfig::new().poll_timeout(Duration::from_millis(50)),
    )
    .spawn(CancellationToken::new());

    wait_for(|| observer.fail_count() == 1).await;
    loop_handle.shutdown().await.unwrap();
    assert_eq!(observer.ok_count(), 0);
}

#[tokio::test]
async fn test_on_demand_read_while_loop_runs() {
    let (opener, handle) = ScriptedLink::new();
    let mut reader = SharedReader::new(HardwareReader::new(opener, ReaderConfig::default()));
    reader.initialize().await.unwrap();

    let loop_handle = AccessLoop::new(
        reader.clone(),
        StaticAuthorizer::new(),
        NoopDoor::new(),
        AccessLoopConfig::new().poll_timeout(Duration::from_millis(20)),
    )
    .spawn(CancellationToken::new());
    let service = ReadTagService::new(reader);

    // Nothing presented: both sides see no tag and neither corrupts the session.
    let state = service.read_next_tag(Duration::from_millis(100)).await.unwrap();
    assert!(!state.is_tag_available);
    assert_eq!(handle.open_sessions(), 1);

    loop_handle.shutdown().await.unwrap();
}
