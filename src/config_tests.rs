//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.discord.prefix, "!");
        assert_eq!(config.discord.poll_interval_ms, 2000);
        assert_eq!(config.paypal.mode, PayPalMode::Sandbox);
        assert_eq!(config.monitor.check_interval_secs, 3600);
        assert_eq!(config.storage.path, "data/config.json");
        assert_eq!(config.health.port, 10000);
        assert_eq!(config.simulator.port, 8000);
    }

    #[test]
    fn test_monitor_config_defaults() {
        let config = MonitorConfig::default();
        assert_eq!(config.low_balance_threshold, dec!(0.8));
        assert_eq!(config.alert_cooldown_hours, 24);
        assert_eq!(config.alert_history, 5);
    }

    #[test]
    fn test_storage_config_defaults() {
        let config: StorageConfig = toml::from_str("").unwrap();
        assert_eq!(config.default_monthly_cost, dec!(25.00));
        assert_eq!(config.resolved_path().to_str(), Some("data/config.json"));
    }

    #[test]
    fn test_discord_config() {
        let toml_str = r#"
bot_token = "abc.def"
prefix = "?"
admin_user_id = "1234"
notification_channel_id = "999"
"#;
        let config: DiscordConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.bot_token, "abc.def");
        assert_eq!(config.prefix, "?");
        assert_eq!(config.admin_user_id.as_deref(), Some("1234"));
        assert_eq!(config.api_base, "https://discord.com/api/v10");
    }

    #[test]
    fn test_command_channels_fall_back_to_notification_channel() {
        let mut config = DiscordConfig::default();
        assert!(config.command_channels().is_empty());

        config.notification_channel_id = Some("999".to_string());
        assert_eq!(config.command_channels(), vec!["999".to_string()]);

        config.command_channel_ids = vec!["1".to_string(), "2".to_string()];
        assert_eq!(config.command_channels(), vec!["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn test_paypal_base_url_by_mode() {
        let toml_str = r#"
client_id = "id"
client_secret = "secret"
mode = "live"
"#;
        let mut config: PayPalConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.mode, PayPalMode::Live);
        assert_eq!(config.base_url(), "https://api.paypal.com");

        config.mode = PayPalMode::Sandbox;
        assert_eq!(config.base_url(), "https://api.sandbox.paypal.com");

        config.base_url_override = Some("http://127.0.0.1:9000/".to_string());
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
    }

    #[test]
    fn test_simulator_scpi_defaults() {
        let config = SimulatorConfig::default();
        assert_eq!(config.comete.price_per_share, 250.0);
        assert_eq!(config.comete.min_investment, 5000.0);
        assert_eq!(config.activimmo.price_per_share, 610.0);
        assert_eq!(config.activimmo.annual_yield, 0.055);
        assert_eq!(config.max_duration_full, 20);
        assert_eq!(config.max_duration_bare, 12);
    }

    #[test]
    fn test_simulator_scpi_override() {
        let toml_str = r#"
[comete]
price_per_share = 300.0
min_investment = 6000.0
annual_yield = 0.05
capital_appreciation = 0.02
"#;
        let config: SimulatorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.comete.price_per_share, 300.0);
        assert_eq!(config.activimmo.price_per_share, 610.0);
    }

    #[test]
    fn test_cors_origins_development_fallback() {
        let config = SimulatorConfig::default();
        let origins = config.cors_origins();
        assert_eq!(origins.len(), 4);
        assert!(origins.contains(&"http://localhost:5173".to_string()));
    }

    #[test]
    fn test_cors_origins_production_empty() {
        let config = SimulatorConfig {
            environment: "production".to_string(),
            ..Default::default()
        };
        assert!(config.cors_origins().is_empty());
    }

    #[test]
    fn test_cors_origins_parsed() {
        let config = SimulatorConfig {
            cors_origins: " https://a.example , ,https://b.example".to_string(),
            ..Default::default()
        };
        assert_eq!(
            config.cors_origins(),
            vec!["https://a.example".to_string(), "https://b.example".to_string()]
        );
    }

    #[test]
    fn test_api_mount_normalised() {
        let mount = |prefix: &str| {
            SimulatorConfig {
                api_prefix: prefix.to_string(),
                ..Default::default()
            }
            .api_mount()
        };
        assert_eq!(SimulatorConfig::default().api_mount(), "/api/v1");
        assert_eq!(mount("api/v2/"), "/api/v2");
        assert_eq!(mount(" /api "), "/api");
        assert_eq!(mount("/"), "");
        assert_eq!(mount(""), "");
    }
}
