/// Settings file tests. Every test uses its own directory and explicit paths,
/// so nothing here touches the user's real config.

#[cfg(test)]
mod settings_tests {
    use crate::error::ConfigError;
    use crate::models::ProviderKind;
    use crate::settings::{load_settings_from, save_settings_to, ProviderSettings, Settings};
    use crate::tests::helpers::setup_test_dir;
    use std::fs;

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = setup_test_dir();
        let path = dir.join("nested").join("settings.json");

        let settings = load_settings_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.active_provider().unwrap(), ProviderKind::Anthropic);
        assert_eq!(settings.chat.max_conversation_length, 20);
        assert!(settings.chat.confirm_code_execution);
        assert_eq!(settings.http_timeout_secs, 60);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_save_then_load_preserves_choices() {
        let dir = setup_test_dir();
        let path = dir.join("settings.json");

        let mut settings = Settings::default();
        settings.provider = "openai".to_string();
        settings.chat.debug_mode = true;
        settings.providers.insert(
            "openai".to_string(),
            ProviderSettings {
                model: "gpt-4o".to_string(),
                url: Some("http://localhost:8080/v1".to_string()),
                api_key: None,
            },
        );
        save_settings_to(&path, &settings).unwrap();

        let loaded = load_settings_from(&path).unwrap();
        assert_eq!(loaded, settings);

        let config = loaded.provider_config(" sk-test-0123456789 ").unwrap();
        assert_eq!(config.provider, ProviderKind::Openai);
        assert_eq!(config.api_key, "sk-test-0123456789");
        assert_eq!(config.model, "gpt-4o");
        assert_eq!(config.base_url.as_deref(), Some("http://localhost:8080/v1"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_partial_file_is_normalized() {
        let dir = setup_test_dir();
        let path = dir.join("settings.json");
        fs::write(
            &path,
            r#"{
                "provider": "google",
                "providers": { "google": { "model": "gemini-2.0-pro-exp-02-05", "url": "" } },
                "chat": { "max_conversation_length": 500 },
                "http_timeout_secs": 0
            }"#,
        )
        .unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings.active_provider().unwrap(), ProviderKind::Gemini);
        assert_eq!(
            settings.provider_settings(ProviderKind::Gemini).model,
            "gemini-2.0-pro-exp-02-05"
        );
        assert!(!settings.providers.contains_key("google"));
        assert_eq!(settings.chat.max_conversation_length, 100);
        assert!(settings.chat.confirm_code_execution);
        assert_eq!(settings.http_timeout_secs, 60);

        // Blank URLs mean "use the vendor default"
        let config = settings.provider_config("AIzaTestKey0123").unwrap();
        assert_eq!(config.base_url, None);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unparsable_file_falls_back_to_defaults() {
        let dir = setup_test_dir();
        let path = dir.join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let settings = load_settings_from(&path).unwrap();
        assert_eq!(settings, Settings::default());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_unknown_provider_is_reported() {
        let mut settings = Settings::default();
        settings.provider = "ollama".to_string();
        match settings.provider_config("sk-test-0123456789") {
            Err(ConfigError::UnknownProvider(err)) => assert_eq!(err.0, "ollama"),
            other => panic!("expected unknown provider, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_text_key_is_never_written_when_absent() {
        let dir = setup_test_dir();
        let path = dir.join("settings.json");
        save_settings_to(&path, &Settings::default()).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(!content.contains("api_key"));

        let _ = fs::remove_dir_all(&dir);
    }
}
