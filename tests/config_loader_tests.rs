use retail_api::config::ConfigLoader;
use std::{
    env, fs,
    path::PathBuf,
    sync::{Mutex, MutexGuard, OnceLock},
};
use tempfile::TempDir;

const VARS: &[&str] = &[
    "RETAIL_PROFILE",
    "RETAIL_API_BIND_ADDR",
    "RETAIL_LOG_LEVEL",
    "RETAIL_OPERATOR_TOKEN",
    "RETAIL_OPERATOR_TOKENS",
    "RETAIL_JWT_SECRET",
    "RETAIL_BASE_CURRENCY",
    "RETAIL_MAX_PAGE_SIZE",
    "RETAIL_DEFAULT_PAGE_SIZE",
    "RETAIL_CORS_ALLOWED_ORIGINS",
];

fn env_lock() -> &'static Mutex<()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
}

fn env_guard() -> MutexGuard<'static, ()> {
    env_lock()
        .lock()
        .unwrap_or_else(|poison| poison.into_inner())
}

fn clear_env() {
    for var in VARS {
        unsafe {
            env::remove_var(var);
        }
    }
}

fn write_env_file(dir: &TempDir, name: &str, contents: &str) {
    let path = dir.path().join(name);
    fs::write(path, contents).unwrap();
}

fn loader_for(dir: &TempDir) -> ConfigLoader {
    ConfigLoader::with_base_dir(PathBuf::from(dir.path()))
}

#[test]
fn loads_defaults_when_only_a_token_is_set() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("RETAIL_OPERATOR_TOKEN", "local-token");
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with defaults");

    assert_eq!(cfg.profile, "local");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:8080");
    assert_eq!(cfg.log_level, "info");
    assert_eq!(cfg.base_currency, "BOB");
    assert_eq!(cfg.default_page_size, 20);
    assert_eq!(cfg.max_page_size, 100);
    assert_eq!(cfg.operator_tokens, vec!["local-token".to_string()]);
    cfg.bind_addr().expect("default bind addr parses");
    clear_env();
}

#[test]
fn layered_env_files_apply_in_order() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(&temp_dir, ".env", "RETAIL_API_BIND_ADDR=127.0.0.1:3000\n");
    write_env_file(
        &temp_dir,
        ".env.test",
        "RETAIL_API_BIND_ADDR=192.168.0.10:5000\n",
    );
    write_env_file(
        &temp_dir,
        ".env.test.local",
        "RETAIL_API_BIND_ADDR=10.0.0.5:6000\n",
    );

    // Select profile via .env.local before profile-specific files load.
    write_env_file(
        &temp_dir,
        ".env.local",
        "RETAIL_PROFILE=test\nRETAIL_API_BIND_ADDR=127.0.0.1:4000\nRETAIL_OPERATOR_TOKEN=layered-token\n",
    );

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with layered env files");

    assert_eq!(cfg.profile, "test");
    assert_eq!(cfg.api_bind_addr, "10.0.0.5:6000");
    clear_env();
}

#[test]
fn os_environment_has_highest_precedence() {
    let _guard = env_guard();
    clear_env();

    let temp_dir = TempDir::new().unwrap();
    write_env_file(
        &temp_dir,
        ".env",
        "RETAIL_API_BIND_ADDR=127.0.0.1:3000\nRETAIL_OPERATOR_TOKEN=file-token\nRETAIL_BASE_CURRENCY=USD\n",
    );

    unsafe {
        env::set_var("RETAIL_API_BIND_ADDR", "0.0.0.0:9090");
    }

    let cfg = loader_for(&temp_dir)
        .load()
        .expect("config loads with env override");
    assert_eq!(cfg.api_bind_addr, "0.0.0.0:9090");
    assert_eq!(cfg.base_currency, "USD");

    clear_env();
}

#[test]
fn token_list_wins_over_single_token() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("RETAIL_OPERATOR_TOKEN", "single");
        env::set_var("RETAIL_OPERATOR_TOKENS", "front-desk, back-office,,");
        env::set_var("RETAIL_CORS_ALLOWED_ORIGINS", "http://localhost:5173");
    }

    let cfg = loader_for(&temp_dir).load().expect("config loads");
    assert_eq!(
        cfg.operator_tokens,
        vec!["front-desk".to_string(), "back-office".to_string()]
    );
    assert_eq!(cfg.cors_allowed_origins, vec!["http://localhost:5173".to_string()]);

    clear_env();
}

#[test]
fn missing_credentials_are_rejected() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    let err = loader_for(&temp_dir)
        .load()
        .expect_err("no token and no jwt secret should fail");
    assert!(format!("{}", err).contains("no credentials configured"));

    unsafe {
        env::set_var("RETAIL_JWT_SECRET", "signing-secret");
    }
    let cfg = loader_for(&temp_dir).load().expect("jwt secret alone is enough");
    assert!(cfg.operator_tokens.is_empty());

    clear_env();
}

#[test]
fn invalid_values_return_errors() {
    let _guard = env_guard();
    clear_env();
    let temp_dir = TempDir::new().unwrap();

    unsafe {
        env::set_var("RETAIL_OPERATOR_TOKEN", "token");
        env::set_var("RETAIL_API_BIND_ADDR", "not-an-addr");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("invalid bind addr should fail");
    assert!(format!("{}", err).contains("invalid api bind address"));

    unsafe {
        env::remove_var("RETAIL_API_BIND_ADDR");
        env::set_var("RETAIL_MAX_PAGE_SIZE", "lots");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("non-numeric page size should fail");
    assert!(format!("{}", err).contains("MAX_PAGE_SIZE"));

    unsafe {
        env::remove_var("RETAIL_MAX_PAGE_SIZE");
        env::set_var("RETAIL_BASE_CURRENCY", "bolivianos");
    }
    let err = loader_for(&temp_dir)
        .load()
        .expect_err("malformed currency should fail");
    assert!(format!("{}", err).contains("base currency"));

    clear_env();
}
