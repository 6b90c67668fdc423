use iot_config::{AppConfig, ConfigError};

#[test]
fn invalid_number_is_reported() {
    unsafe {
        std::env::set_var("IOT_MQTT_PORT", "not-a-port");
    }
    let err = AppConfig::from_env().expect_err("invalid");
    match err {
        ConfigError::Invalid(key, value) => {
            assert_eq!(key, "IOT_MQTT_PORT");
            assert_eq!(value, "not-a-port");
        }
        other => panic!("unexpected error: {}", other),
    }
}
