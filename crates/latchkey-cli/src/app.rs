//! Wiring of the controller from its configuration.

use crate::config::{Config, DoorKind, DoorSettings, ReaderKind, ReaderSettings};
use anyhow::{Context, bail};
use chrono::{FixedOffset, Local};
use latchkey_access::{AccessLoop, ReadTagService, handle_read_next_tag};
use latchkey_core::{AccessAuthorizer, Error, StaticAuthorizer};
use latchkey_door::{
    AnyDoor, AnyLatch, Door, LatchDoor, LatchHandle, MultiLatch, NoopDoor, PulseLatch,
    SystemClock, TimeWindow, TimedLatch,
};
use latchkey_hardware::noop::NoopReader;
use latchkey_hardware::pin::SysfsPin;
use latchkey_hardware::reader::HardwareReader;
use latchkey_hardware::traits::LinkOpener;
use latchkey_hardware::{SharedReader, TagReader};
use latchkey_storage::{Database, DatabaseConfig, SqliteKeyStore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Key lookup backend chosen by the configuration.
#[derive(Debug, Clone)]
pub enum Authorizer {
    Sqlite(SqliteKeyStore),
    Static(StaticAuthorizer),
}

impl AccessAuthorizer for Authorizer {
    async fn is_access_allowed(&self, tag_id: &str) -> latchkey_core::Result<bool> {
        match self {
            Self::Sqlite(store) => store.is_access_allowed(tag_id).await,
            Self::Static(keys) => keys.is_access_allowed(tag_id).await,
        }
    }
}

pub fn build_reader(settings: &ReaderSettings) -> anyhow::Result<SharedReader> {
    build_reader_with(settings, None)
}

/// Build the configured reader, opening hardware sessions through `driver`.
pub fn build_reader_with(
    settings: &ReaderSettings,
    driver: Option<Box<dyn LinkOpener>>,
) -> anyhow::Result<SharedReader> {
    match (settings.kind, driver) {
        (ReaderKind::Noop, _) => {
            warn!("Using no-op reader; every poll reports an all-zero tag");
            Ok(SharedReader::new(NoopReader::new()))
        }
        (ReaderKind::Hardware, Some(driver)) => {
            info!(antenna_gain = settings.antenna_gain, "Using hardware reader");
            Ok(SharedReader::new(HardwareReader::new(
                driver,
                settings.reader_config(),
            )))
        }
        (ReaderKind::Hardware, None) => bail!(
            "reader kind \"hardware\" needs a reader driver, and this binary is built without one"
        ),
    }
}

/// Settings meant for the controller embedding this crate, which this binary
/// does not act on.
fn unserved_settings(config: &Config) -> Vec<&'static str> {
    let mut unserved = Vec::new();
    if config.listen_http.is_some() {
        unserved.push("listen_http");
    }
    unserved
}

pub async fn build_authorizer(config: &Config) -> anyhow::Result<Authorizer> {
    match &config.sqlite_file {
        Some(path) => {
            let db = Database::new(DatabaseConfig::new(path.as_str()))
                .await
                .with_context(|| format!("failed to open key database {path}"))?;
            Ok(Authorizer::Sqlite(SqliteKeyStore::from_database(&db)))
        }
        None => {
            warn!(
                keys = config.allowed_keys.len(),
                "No key database configured, using allowed_keys"
            );
            let keys = config
                .allowed_keys
                .iter()
                .fold(StaticAuthorizer::new(), |keys, key| keys.allow(key.as_str()));
            Ok(Authorizer::Static(keys))
        }
    }
}

/// Build the door and start its latch tasks. Must run inside a runtime.
pub fn build_door(settings: &DoorSettings) -> anyhow::Result<AnyDoor> {
    match settings.kind {
        DoorKind::Noop => {
            warn!("Using no-op door; signals are only logged");
            Ok(NoopDoor::new().into())
        }
        DoorKind::Gpio => build_gpio_door(settings),
    }
}

fn build_gpio_door(settings: &DoorSettings) -> anyhow::Result<AnyDoor> {
    let open = |number: u32| {
        SysfsPin::with_root(&settings.gpio_root, number)
            .with_context(|| format!("failed to set up GPIO {number}"))
    };

    // All pins are claimed before any latch task starts.
    let main_number = settings
        .main_pin
        .ok_or_else(|| Error::MissingConfig("door.main_pin".to_string()))?;
    let main_pin = open(main_number)?;
    let bolt_pin = settings.bolt_pin.map(&open).transpose()?;
    let fail_pin = settings.fail_pin.map(&open).transpose()?;

    let mut ok_latches = vec![PulseLatch::new(main_pin).spawn()];
    if let Some(pin) = bolt_pin {
        ok_latches.push(spawn_bolt_latch(pin, settings)?);
    }

    let ok_latch: AnyLatch = MultiLatch::new(ok_latches).into();
    let fail_latch = fail_pin.map(|pin| AnyLatch::from(PulseLatch::new(pin).spawn()));
    let door_config = settings.door_config();

    info!(
        main_pin = main_number,
        bolt_pin = ?settings.bolt_pin,
        fail_pin = ?settings.fail_pin,
        unlock_ms = door_config.unlock_duration.as_millis() as u64,
        "Door configured"
    );

    Ok(LatchDoor::spawn(ok_latch, fail_latch, door_config.unlock_duration).into())
}

fn spawn_bolt_latch(pin: SysfsPin, settings: &DoorSettings) -> anyhow::Result<LatchHandle> {
    let (open_from, open_till) = settings.window_times()?;

    let handle = match settings.utc_offset_minutes {
        Some(minutes) => {
            let tz = FixedOffset::east_opt(minutes * 60)
                .ok_or_else(|| Error::Config(format!("invalid UTC offset: {minutes} minutes")))?;
            let window = TimeWindow::new(open_from, open_till, tz)?;
            TimedLatch::new(pin, window, SystemClock).spawn()
        }
        None => {
            let window = TimeWindow::new(open_from, open_till, Local)?;
            TimedLatch::new(pin, window, SystemClock).spawn()
        }
    };
    Ok(handle)
}

/// Run the access loop until Ctrl-C.
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let mut reader = build_reader(&config.reader)?;
    reader
        .initialize()
        .await
        .context("failed to initialize reader")?;

    let authorizer = build_authorizer(&config).await?;
    let door = build_door(&config.door)?;

    for setting in unserved_settings(&config) {
        warn!(
            setting,
            "Ignoring setting: this binary serves no management API, use `latchkey read` for on-demand reads"
        );
    }

    let cancel = CancellationToken::new();
    let access_loop = AccessLoop::new(
        reader.clone(),
        authorizer,
        door,
        config.access.loop_config(),
    )
    .spawn(cancel.clone());

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("Shutting down");

    match access_loop.shutdown().await {
        Some(exit) => {
            info!(
                tags_read = exit.stats.tags_read,
                granted = exit.stats.granted,
                denied = exit.stats.denied,
                "Access loop stopped"
            );
            exit.door.shutdown().await;
        }
        None => warn!("Access loop ended abnormally; latches were not shut down"),
    }

    reader.halt().await.context("failed to halt reader")?;
    Ok(())
}

/// One on-demand read, printed as the API would answer it.
pub async fn read_once(config: &Config, timeout_sec: Option<&str>) -> anyhow::Result<String> {
    let mut reader = build_reader(&config.reader)?;
    reader
        .initialize()
        .await
        .context("failed to initialize reader")?;

    let service = ReadTagService::new(reader.clone());
    let response = handle_read_next_tag(&service, timeout_sec).await;

    reader.halt().await.context("failed to halt reader")?;

    if response.status != 200 {
        bail!("read failed ({}): {}", response.status, response.body);
    }
    Ok(response.body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use latchkey_hardware::mock::ScriptedLink;
    use std::fs;
    use std::path::Path;
    use std::time::Duration;

    fn fake_gpio_root(pins: &[u32]) -> tempfile::TempDir {
        let root = tempfile::tempdir().unwrap();
        fs::write(root.path().join("export"), "").unwrap();
        for pin in pins {
            let dir = root.path().join(format!("gpio{pin}"));
            fs::create_dir(&dir).unwrap();
            fs::write(dir.join("direction"), "").unwrap();
            fs::write(dir.join("value"), "").unwrap();
        }
        root
    }

    fn value(root: &Path, pin: u32) -> String {
        fs::read_to_string(root.join(format!("gpio{pin}/value")))
            .unwrap()
            .trim()
            .to_string()
    }

    #[tokio::test]
    async fn test_static_authorizer_from_allowed_keys() {
        let config = Config {
            allowed_keys: vec!["35c17053".to_string()],
            ..Config::default()
        };

        let authorizer = build_authorizer(&config).await.unwrap();
        assert!(matches!(authorizer, Authorizer::Static(_)));
        assert!(authorizer.is_access_allowed("35c17053").await.unwrap());
        assert!(!authorizer.is_access_allowed("00000000").await.unwrap());
    }

    #[tokio::test]
    async fn test_sqlite_authorizer() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            sqlite_file: Some(dir.path().join("keys.db").display().to_string()),
            ..Config::default()
        };

        let authorizer = build_authorizer(&config).await.unwrap();
        assert!(matches!(authorizer, Authorizer::Sqlite(_)));
        assert!(!authorizer.is_access_allowed("35c17053").await.unwrap());
    }

    #[test]
    fn test_hardware_reader_kind_rejected() {
        let settings = ReaderSettings {
            kind: ReaderKind::Hardware,
            ..ReaderSettings::default()
        };
        assert!(build_reader(&settings).is_err());
    }

    #[tokio::test]
    async fn test_hardware_reader_uses_configured_gain() {
        let settings = ReaderSettings {
            kind: ReaderKind::Hardware,
            antenna_gain: 3,
        };
        let (opener, handle) = ScriptedLink::new();

        let mut reader = build_reader_with(&settings, Some(Box::new(opener))).unwrap();
        reader.initialize().await.unwrap();

        assert_eq!(handle.antenna_gain(), Some(3));
        assert_eq!(handle.opens(), 1);
        reader.halt().await.unwrap();
    }

    #[test]
    fn test_listen_http_reported_as_unserved() {
        assert!(unserved_settings(&Config::default()).is_empty());

        let config = Config {
            listen_http: Some(":8080".to_string()),
            ..Config::default()
        };
        assert_eq!(unserved_settings(&config), vec!["listen_http"]);
    }

    #[tokio::test]
    async fn test_gpio_door_pulses_main_pin() {
        let root = fake_gpio_root(&[22, 23]);
        let settings = DoorSettings {
            kind: DoorKind::Gpio,
            main_pin: Some(22),
            fail_pin: Some(23),
            unlock_duration_ms: 50,
            gpio_root: root.path().display().to_string(),
            ..DoorSettings::default()
        };

        let door = build_door(&settings).unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(value(root.path(), 22), "1");

        assert!(door.auth_ok().unwrap().is_accepted());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(value(root.path(), 22), "0");
        assert_eq!(value(root.path(), 23), "1");

        door.shutdown().await;
        assert_eq!(value(root.path(), 22), "1");
    }

    #[tokio::test]
    async fn test_gpio_door_missing_pin_directory() {
        let root = fake_gpio_root(&[22]);
        let settings = DoorSettings {
            kind: DoorKind::Gpio,
            main_pin: Some(22),
            bolt_pin: Some(27),
            gpio_root: root.path().display().to_string(),
            ..DoorSettings::default()
        };

        assert!(build_door(&settings).is_err());
    }

    #[tokio::test]
    async fn test_read_once_with_noop_reader() {
        let body = read_once(&Config::default(), Some("1")).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(json["is_tag_available"], true);
        assert_eq!(json["tag_info"]["id"], "00000000000000000000000000000000");
    }
}
