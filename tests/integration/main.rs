//! Integration tests for fontagent

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn fontagent(config_dir: &Path) -> Command {
        let mut cmd = cargo_bin_cmd!("fontagent");
        cmd.env("FONTAGENT_CONFIG", config_dir.join("config.toml"));
        cmd
    }

    #[test]
    fn help_displays() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Licensed font agent"));
    }

    #[test]
    fn version_displays() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("fontagent"));
    }

    #[test]
    fn status_runs() {
        // Status reports missing fontconfig but should not panic
        let temp = TempDir::new().unwrap();
        let _ = fontagent(temp.path()).arg("status").assert();
    }

    #[test]
    fn config_path_honors_env() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                temp.path().join("config.toml").display().to_string(),
            ));
    }

    #[test]
    fn config_show() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("from built-in defaults"))
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("download_timeout_secs = 60"));
    }

    #[test]
    fn config_init_writes_defaults() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .args(["config", "init"])
            .assert()
            .success();

        let written = std::fs::read_to_string(temp.path().join("config.toml")).unwrap();
        assert!(written.contains("[sync]"));
    }

    #[test]
    fn config_init_stores_checked_source() {
        let temp = TempDir::new().unwrap();
        let fonts = temp.path().join("fonts");
        std::fs::create_dir_all(fonts.join("Acme")).unwrap();
        std::fs::write(fonts.join("Acme/Acme-Sans.ttf"), b"\x00\x01\x00\x00").unwrap();

        fontagent(temp.path())
            .args(["config", "init", "--source"])
            .arg(&fonts)
            .assert()
            .success()
            .stdout(predicate::str::contains("Catalog has 1 font(s)"));

        fontagent(temp.path())
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout("Acme-Acme-Sans\n");
    }

    #[test]
    fn config_init_rejects_missing_source() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .args(["config", "init", "--source"])
            .arg(temp.path().join("nowhere"))
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid catalog"));
        assert!(!temp.path().join("config.toml").exists());
    }

    #[test]
    fn invalid_config_is_reported() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("config.toml"), "[cache\n").unwrap();
        fontagent(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid configuration"));
    }

    #[test]
    fn zero_download_timeout_is_rejected() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            "[sync]\ndownload_timeout_secs = 0\n",
        )
        .unwrap();
        fontagent(temp.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("download_timeout_secs"));
    }

    #[test]
    fn list_without_source_hints() {
        let temp = TempDir::new().unwrap();
        fontagent(temp.path())
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("No font catalog source"))
            .stderr(predicate::str::contains("Hint:"));
    }

    #[test]
    fn list_scans_source_directory() {
        let temp = TempDir::new().unwrap();
        let fonts = temp.path().join("fonts");
        std::fs::create_dir_all(fonts.join("Acme")).unwrap();
        std::fs::write(fonts.join("Acme/Acme-Sans.ttf"), b"\x00\x01\x00\x00").unwrap();
        std::fs::write(fonts.join("Acme/Acme-Serif.otf"), b"OTTO").unwrap();

        fontagent(temp.path())
            .args(["list", "--format", "plain", "--source"])
            .arg(&fonts)
            .assert()
            .success()
            .stdout("Acme-Acme-Sans\nAcme-Acme-Serif\n");
    }

    #[test]
    fn list_json_uses_configured_source() {
        let temp = TempDir::new().unwrap();
        let fonts = temp.path().join("fonts");
        std::fs::create_dir_all(&fonts).unwrap();
        std::fs::write(fonts.join("Loose-Bold.ttf"), b"\x00\x01\x00\x00").unwrap();
        std::fs::write(
            temp.path().join("config.toml"),
            format!("[catalog]\nsource = {:?}\n", fonts.display().to_string()),
        )
        .unwrap();

        fontagent(temp.path())
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"displayName\": \"Loose Bold\""))
            .stdout(predicate::str::contains("\"provider\": \"Unknown\""));
    }

    #[test]
    fn sync_unknown_font_fails() {
        let temp = TempDir::new().unwrap();
        let fonts = temp.path().join("fonts");
        std::fs::create_dir_all(&fonts).unwrap();

        fontagent(temp.path())
            .args(["sync", "--font", "nope", "--source"])
            .arg(&fonts)
            .assert()
            .failure()
            .stderr(predicate::str::contains("Font not found: nope"));
    }
}

mod lifecycle_tests {
    use async_trait::async_trait;
    use fontagent::catalog;
    use fontagent::config::Config;
    use fontagent::registrar::{FontRegistrar, UnregisterSummary};
    use fontagent::sync::{HttpDownloader, SyncProgress};
    use fontagent::{Agent, AgentError, AgentResult};
    use std::collections::HashSet;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;
    use tokio::sync::mpsc;

    /// In-memory stand-in for the platform text stack
    #[derive(Default)]
    struct RecordingRegistrar {
        active: Mutex<HashSet<PathBuf>>,
        refused: Mutex<HashSet<String>>,
    }

    impl RecordingRegistrar {
        fn refuse(&self, file_name_fragment: &str) {
            self.refused
                .lock()
                .unwrap()
                .insert(file_name_fragment.to_string());
        }

        fn active_count(&self) -> usize {
            self.active.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl FontRegistrar for RecordingRegistrar {
        async fn is_available(&self) -> bool {
            true
        }

        async fn register(&self, path: &Path) -> AgentResult<bool> {
            let name = path.to_string_lossy();
            if self
                .refused
                .lock()
                .unwrap()
                .iter()
                .any(|fragment| name.contains(fragment.as_str()))
            {
                return Ok(false);
            }
            self.active.lock().unwrap().insert(path.to_path_buf());
            Ok(true)
        }

        async fn unregister(&self, path: &Path) -> AgentResult<bool> {
            Ok(self.active.lock().unwrap().remove(path))
        }

        async fn unregister_all(&self) -> AgentResult<UnregisterSummary> {
            let mut active = self.active.lock().unwrap();
            let success = active.len();
            active.clear();
            Ok(UnregisterSummary { success, failed: 0 })
        }

        fn registrar_name(&self) -> &'static str {
            "recording"
        }
    }

    struct Env {
        state: TempDir,
        fonts: TempDir,
        config: Config,
    }

    fn env() -> Env {
        let state = TempDir::new().unwrap();
        let fonts = TempDir::new().unwrap();
        let mut config = Config::default();
        config.general.audit_log = false;
        config.cache.base_dir = Some(state.path().to_path_buf());
        config.cache.enable_file_watcher = false;
        config.cache.enable_obfuscation = false;
        Env {
            state,
            fonts,
            config,
        }
    }

    fn add_font(env: &Env, provider: &str, file: &str, bytes: &[u8]) {
        let dir = env.fonts.path().join(provider);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(file), bytes).unwrap();
    }

    fn cache_dir(env: &Env) -> PathBuf {
        env.state.path().join(".system/.cache/.tmp/.fonts")
    }

    #[tokio::test]
    async fn catalog_sync_and_teardown() {
        let env = env();
        add_font(&env, "Acme", "Acme-Sans.ttf", b"\x00\x01\x00\x00sans");
        add_font(&env, "Acme", "Acme-Serif.otf", b"OTTOserif");
        add_font(&env, "Acme", "Acme-Broken.ttf", b"<html>");

        let registrar = Arc::new(RecordingRegistrar::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let agent = Agent::start_with(
            &env.config,
            registrar.clone(),
            Arc::new(HttpDownloader::default()),
            Some(tx),
        )
        .await
        .unwrap();

        let entries = catalog::load(env.fonts.path()).await.unwrap();
        assert_eq!(entries.len(), 3);

        let result = agent.orchestrator().sync_all_fonts(&entries).await.unwrap();
        assert_eq!(result.success_count, 2);
        assert_eq!(result.failed_count, 1);
        assert_eq!(result.errors[0].id, "Acme-Acme-Broken");

        let fonts = agent.manager().get_registered_fonts();
        assert_eq!(fonts.len(), 2);
        assert!(fonts.iter().all(|f| f.is_active));
        assert!(fonts.iter().all(|f| f.file_path.starts_with(cache_dir(&env))));
        assert_eq!(registrar.active_count(), 2);

        let mut last = SyncProgress::default();
        while let Ok(progress) = rx.try_recv() {
            last = progress;
        }
        assert_eq!(last.completed, 3);
        assert_eq!(last.percentage, 100);

        agent.shutdown().await;

        assert_eq!(registrar.active_count(), 0);
        assert!(agent.manager().get_registered_fonts().is_empty());
        assert_eq!(std::fs::read_dir(cache_dir(&env)).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn refused_font_leaves_no_file() {
        let env = env();
        add_font(&env, "Acme", "Acme-Sans.ttf", b"\x00\x01\x00\x00sans");
        let registrar = Arc::new(RecordingRegistrar::default());
        registrar.refuse("Acme-Acme-Sans");

        let agent = Agent::start_with(
            &env.config,
            registrar.clone(),
            Arc::new(HttpDownloader::default()),
            None,
        )
        .await
        .unwrap();
        let entries = catalog::load(env.fonts.path()).await.unwrap();

        let result = agent.orchestrator().sync_all_fonts(&entries).await.unwrap();

        assert_eq!(result.failed_count, 1);
        assert!(!agent.manager().is_font_registered("Acme-Acme-Sans"));
        assert_eq!(std::fs::read_dir(cache_dir(&env)).unwrap().count(), 0);
        agent.shutdown().await;
    }

    #[tokio::test]
    async fn manual_unregister_deletes_file() {
        let env = env();
        add_font(&env, "Acme", "Acme-Sans.ttf", b"\x00\x01\x00\x00sans");
        let registrar = Arc::new(RecordingRegistrar::default());
        let agent = Agent::start_with(
            &env.config,
            registrar.clone(),
            Arc::new(HttpDownloader::default()),
            None,
        )
        .await
        .unwrap();
        let entries = catalog::load(env.fonts.path()).await.unwrap();
        agent.orchestrator().sync_all_fonts(&entries).await.unwrap();

        let record = agent.manager().get_font("Acme-Acme-Sans").unwrap();
        assert!(record.file_path.exists());

        agent.manager().unregister_font("Acme-Acme-Sans").await.unwrap();
        assert!(!record.file_path.exists());
        assert_eq!(registrar.active_count(), 0);

        let err = agent
            .manager()
            .unregister_font("Acme-Acme-Sans")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::FontNotFound(_)));
        agent.shutdown().await;
    }

    #[tokio::test]
    async fn toggle_single_font_while_running() {
        let env = env();
        add_font(&env, "Acme", "Acme-Sans.ttf", b"\x00\x01\x00\x00sans");
        add_font(&env, "Acme", "Acme-Serif.otf", b"OTTOserif");
        let registrar = Arc::new(RecordingRegistrar::default());
        let agent = Agent::start_with(
            &env.config,
            registrar.clone(),
            Arc::new(HttpDownloader::default()),
            None,
        )
        .await
        .unwrap();
        let entries = catalog::load(env.fonts.path()).await.unwrap();
        agent.orchestrator().sync_all_fonts(&entries).await.unwrap();

        agent.disable_font("Acme-Acme-Sans").await.unwrap();
        assert!(!agent.manager().is_font_registered("Acme-Acme-Sans"));
        assert!(agent.manager().is_font_registered("Acme-Acme-Serif"));
        assert_eq!(registrar.active_count(), 1);
        assert_eq!(std::fs::read_dir(cache_dir(&env)).unwrap().count(), 1);

        let sans = entries.iter().find(|e| e.id == "Acme-Acme-Sans").unwrap();
        agent.enable_font(sans).await.unwrap();
        assert!(agent.manager().is_font_registered("Acme-Acme-Sans"));
        assert_eq!(registrar.active_count(), 2);

        agent.shutdown().await;
        assert_eq!(registrar.active_count(), 0);
        let err = agent.enable_font(sans).await.unwrap_err();
        assert!(matches!(err, AgentError::ShuttingDown));
        assert_eq!(std::fs::read_dir(cache_dir(&env)).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn restart_reclaims_crashed_run() {
        let env = env();
        add_font(&env, "Acme", "Acme-Sans.ttf", b"\x00\x01\x00\x00sans");
        let registrar = Arc::new(RecordingRegistrar::default());

        let crashed = Agent::start_with(
            &env.config,
            registrar.clone(),
            Arc::new(HttpDownloader::default()),
            None,
        )
        .await
        .unwrap();
        let entries = catalog::load(env.fonts.path()).await.unwrap();
        crashed.orchestrator().sync_all_fonts(&entries).await.unwrap();
        // No shutdown: the process "dies" here
        drop(crashed);
        assert_eq!(registrar.active_count(), 1);

        let agent = Agent::start_with(
            &env.config,
            registrar.clone(),
            Arc::new(HttpDownloader::default()),
            None,
        )
        .await
        .unwrap();

        assert_eq!(registrar.active_count(), 0);
        assert_eq!(agent.cache().entry_count().await, 0);
        agent.shutdown().await;
    }
}
