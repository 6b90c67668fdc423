use iot_config::AppConfig;

#[test]
fn load_config_from_env() {
    // Rust 2024 中 set_var 需要显式标注 unsafe（测试进程内可控）。
    unsafe {
        std::env::set_var("IOT_HTTP_ADDR", "127.0.0.1:8081");
        std::env::set_var("IOT_MQTT", "off");
        std::env::set_var("IOT_MQTT_PORT", "1884");
        std::env::set_var("IOT_DEFAULT_DEPARTMENT_FALLBACK", "on");
        std::env::set_var("IOT_MAX_VALUE_BYTES", "512");
        std::env::remove_var("IOT_DATABASE_URL");
    }

    let config = AppConfig::from_env().expect("config");
    assert_eq!(config.http_addr, "127.0.0.1:8081");
    assert!(!config.mqtt_enabled);
    assert_eq!(config.mqtt_port, 1884);
    assert!(config.default_department_fallback);
    assert_eq!(config.max_value_bytes, 512);
    assert!(config.database_url.is_none());

    assert_eq!(config.mqtt_qos, 0);
    assert_eq!(config.mqtt_reconnect_delay_ms, 3000);
    assert_eq!(config.mqtt_liveness_interval_seconds, 30);
    assert_eq!(config.reservation_cleanup_interval_seconds, 300);
    assert_eq!(config.reservation_grace_ms, 10_000);
    assert_eq!(config.default_department_token, "default");
    assert!(config.fire_resource_events);
}
