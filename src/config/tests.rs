#[cfg(test)]
mod tests {
    use crate::config::{BudgetConfig, Config, LLMConfig, LLMProvider, RelayConfig};
    use std::path::PathBuf;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.document_path.is_none());
        assert_eq!(config.output_path, PathBuf::from("./bp-analysis.json"));
        assert_eq!(config.stages, 4);
        assert!(config.questions.is_empty());
        assert!(!config.verbose);
    }

    #[test]
    fn test_llm_provider_default() {
        let provider = LLMProvider::default();
        assert_eq!(provider, LLMProvider::DeepSeek);
    }

    #[test]
    fn test_llm_provider_from_str() {
        assert_eq!(
            "doubao".parse::<LLMProvider>().unwrap(),
            LLMProvider::Doubao
        );
        assert_eq!(
            "deepseek".parse::<LLMProvider>().unwrap(),
            LLMProvider::DeepSeek
        );
        assert_eq!(
            "OpenAI".parse::<LLMProvider>().unwrap(),
            LLMProvider::OpenAI
        );
        assert_eq!(
            " tongyi ".parse::<LLMProvider>().unwrap(),
            LLMProvider::Tongyi
        );

        assert!("anthropic".parse::<LLMProvider>().is_err());
    }

    #[test]
    fn test_llm_provider_display_round_trips() {
        for provider in LLMProvider::ALL {
            assert_eq!(provider.to_string().parse::<LLMProvider>(), Ok(provider));
        }
    }

    #[test]
    fn test_llm_config_default() {
        let config = LLMConfig::default();

        assert_eq!(config.provider, LLMProvider::DeepSeek);
        // api_key may be empty if env var is not set
        assert_eq!(config.timeout_ms, 120_000);
        assert_eq!(config.stage_timeout_ms, 180_000);
        assert_eq!(config.heavy_stage_timeout_ms, 300_000);
        assert_eq!(config.heavy_stage_dimension_threshold, 5);
        assert_eq!(config.chat_timeout_ms, 120_000);
    }

    #[test]
    fn test_stage_timeout_scales_with_dimension_count() {
        let config = LLMConfig::default();

        assert_eq!(config.stage_timeout_for(1), 180_000);
        assert_eq!(config.stage_timeout_for(5), 180_000);
        assert_eq!(config.stage_timeout_for(6), 300_000);
    }

    #[test]
    fn test_relay_and_budget_defaults() {
        let relay = RelayConfig::default();
        assert!(!relay.enabled);
        assert_eq!(relay.url, "http://localhost:3001/api/proxy");

        let budget = BudgetConfig::default();
        assert_eq!(budget.profile_chars, 15_000);
        assert_eq!(budget.stage_chars, 8_000);
        assert_eq!(budget.chat_chars, 5_000);
        assert_eq!(budget.max_document_bytes, 10 * 1024 * 1024);
    }

    #[test]
    fn test_effective_stages_is_clamped() {
        let mut config = Config::default();

        config.stages = 0;
        assert_eq!(config.effective_stages(), 1);
        config.stages = 9;
        assert_eq!(config.effective_stages(), 4);
        config.stages = 2;
        assert_eq!(config.effective_stages(), 2);
    }

    #[test]
    fn test_from_file_with_partial_sections() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bp-analyzer.toml");

        let content = r#"stages = 2
questions = ["这家公司的护城河是什么？"]

[llm]
provider = "tongyi"
api_key = "sk-test"
stage_timeout_ms = 90000

[relay]
enabled = true
"#;
        std::fs::write(&config_path, content).unwrap();

        let config = Config::from_file(&config_path).unwrap();

        assert_eq!(config.stages, 2);
        assert_eq!(config.questions.len(), 1);
        assert_eq!(config.llm.provider, LLMProvider::Tongyi);
        assert_eq!(config.llm.api_key, "sk-test");
        assert_eq!(config.llm.stage_timeout_ms, 90_000);
        // 未配置的字段使用默认值
        assert_eq!(config.llm.heavy_stage_timeout_ms, 300_000);
        assert!(config.relay.enabled);
        assert_eq!(config.relay.url, "http://localhost:3001/api/proxy");
        assert_eq!(config.budget.profile_chars, 15_000);
    }

    #[test]
    fn test_from_file_rejects_unknown_provider() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("bp-analyzer.toml");
        std::fs::write(&config_path, "[llm]\nprovider = \"gemini\"\n").unwrap();

        assert!(Config::from_file(&config_path).is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file(&PathBuf::from("/nonexistent/bp-analyzer.toml"));
        assert!(result.is_err());
    }
}
