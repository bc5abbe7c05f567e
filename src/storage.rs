use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64;
use pbkdf2::pbkdf2_hmac;
use rand_core::OsRng;
use rand_core::TryRngCore;
use rpassword::prompt_password;
use sha2::Sha256;

use crate::ftp::DEFAULT_PORT;
use crate::model::{
    AppConfig, ConnectionConfig, DEFAULT_CAPTURE_DELAY_MS, DEFAULT_TARGET_DIR, EncryptedBlob,
    HotkeyConfig, MasterConfig, StoreFile, StoredConnection, default_aliases,
};

const APP_DIR_NAME: &str = "shotftp";
const MASTER_CHECK: &str = "shotftp-check";

pub(crate) fn config_path() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::config_dir() {
        dir.push(APP_DIR_NAME);
        dir.push("config.json");
        return Ok(dir);
    }
    let mut fallback = std::env::current_dir().context("current dir")?;
    fallback.push("shotftp-config.json");
    Ok(fallback)
}

pub(crate) fn log_path() -> Result<PathBuf> {
    if let Some(mut dir) = dirs::data_local_dir() {
        dir.push(APP_DIR_NAME);
        dir.push("shotftp.log");
        return Ok(dir);
    }
    let mut fallback = std::env::current_dir().context("current dir")?;
    fallback.push("shotftp.log");
    Ok(fallback)
}

pub(crate) fn load_or_init_store(path: &Path) -> Result<AppConfig> {
    if path.exists() {
        let store = load_store(path)?;
        let master_key = prompt_existing_master(&store.master)?;
        return config_from_store(&store, &master_key);
    }

    eprintln!("No configuration found at {}.", path.display());
    let config = prompt_new_config()?;
    let (master, master_key) = setup_master()?;
    let store = store_from_config(master, &master_key, &config)?;
    save_store(path, &store)?;
    eprintln!("Configuration saved to {}.", path.display());
    Ok(config)
}

pub(crate) fn load_store(path: &Path) -> Result<StoreFile> {
    let content = fs::read_to_string(path).context("read config file")?;
    let store = serde_json::from_str(&content).context("parse config file")?;
    Ok(store)
}

pub(crate) fn save_store(path: &Path, store: &StoreFile) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("create config dir")?;
    }
    let content = serde_json::to_string_pretty(store).context("serialize config")?;
    fs::write(path, content).context("write config file")?;
    Ok(())
}

pub(crate) fn config_from_store(store: &StoreFile, key: &[u8]) -> Result<AppConfig> {
    let password = decrypt_string(&store.connection.password, key).context("decrypt password")?;
    Ok(AppConfig {
        connection: ConnectionConfig {
            host: store.connection.host.clone(),
            port: store.connection.port,
            user: store.connection.user.clone(),
            password,
        },
        target_dir: store.target_dir.clone(),
        aliases: store.aliases.clone(),
        hotkey: store.hotkey.clone(),
        capture_delay_ms: store.capture_delay_ms,
    })
}

pub(crate) fn store_from_config(
    master: MasterConfig,
    key: &[u8],
    config: &AppConfig,
) -> Result<StoreFile> {
    Ok(StoreFile {
        master,
        connection: StoredConnection {
            host: config.connection.host.clone(),
            port: config.connection.port,
            user: config.connection.user.clone(),
            password: encrypt_string(&config.connection.password, key)?,
        },
        target_dir: config.target_dir.clone(),
        aliases: config.aliases.clone(),
        hotkey: config.hotkey.clone(),
        capture_delay_ms: config.capture_delay_ms,
    })
}

fn prompt_new_config() -> Result<AppConfig> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let host = loop {
        let host = prompt_line(&mut input, "FTP host", None)?;
        if !host.is_empty() {
            break host;
        }
        eprintln!("Host cannot be empty.");
    };
    let port = loop {
        let raw = prompt_line(&mut input, "FTP port", Some(&DEFAULT_PORT.to_string()))?;
        match raw.parse::<u16>() {
            Ok(port) if port > 0 => break port,
            _ => eprintln!("Invalid port."),
        }
    };
    let user = prompt_line(&mut input, "FTP user", None)?;
    let password = prompt_password("FTP password: ").context("read ftp password")?;
    let target_dir = prompt_line(&mut input, "Target directory", Some(DEFAULT_TARGET_DIR))?;
    Ok(AppConfig {
        connection: ConnectionConfig {
            host,
            port,
            user,
            password,
        },
        target_dir,
        aliases: default_aliases(),
        hotkey: HotkeyConfig::default(),
        capture_delay_ms: DEFAULT_CAPTURE_DELAY_MS,
    })
}

fn prompt_line(input: &mut impl BufRead, label: &str, default: Option<&str>) -> Result<String> {
    match default {
        Some(default) => eprint!("{label} [{default}]: "),
        None => eprint!("{label}: "),
    }
    io::stderr().flush().ok();
    let mut line = String::new();
    input.read_line(&mut line).context("read input")?;
    let value = line.trim();
    if value.is_empty() {
        return Ok(default.unwrap_or_default().to_string());
    }
    Ok(value.to_string())
}

pub(crate) fn prompt_existing_master(master: &MasterConfig) -> Result<Vec<u8>> {
    loop {
        let password = prompt_password("Master password: ").context("read master password")?;
        let salt = Base64.decode(&master.salt_b64).context("decode salt")?;
        let key = derive_key(&password, &salt);
        match decrypt_string(&master.check, &key) {
            Ok(check) if check == MASTER_CHECK => return Ok(key),
            _ => {
                eprintln!("Invalid master password.");
            }
        }
    }
}

pub(crate) fn setup_master() -> Result<(MasterConfig, Vec<u8>)> {
    loop {
        let password = prompt_password("Set master password: ").context("read master password")?;
        let confirm =
            prompt_password("Confirm master password: ").context("read confirm password")?;
        if password != confirm {
            eprintln!("Passwords do not match.");
            continue;
        }
        if password.is_empty() {
            eprintln!("Master password cannot be empty.");
            continue;
        }
        return create_master_from_password(&password);
    }
}

pub(crate) fn create_master_from_password(password: &str) -> Result<(MasterConfig, Vec<u8>)> {
    let mut salt = [0u8; 16];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut salt)
        .map_err(|err| anyhow::anyhow!("random salt failed: {err:?}"))?;
    let key = derive_key(password, &salt);
    let check = encrypt_string(MASTER_CHECK, &key)?;
    let master = MasterConfig {
        salt_b64: Base64.encode(salt),
        check,
    };
    Ok((master, key))
}

pub(crate) fn derive_key(password: &str, salt: &[u8]) -> Vec<u8> {
    let mut key = vec![0u8; 32];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, 100_000, &mut key);
    key
}

pub(crate) fn encrypt_string(plaintext: &str, key: &[u8]) -> Result<EncryptedBlob> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let mut nonce_bytes = [0u8; 12];
    let mut rng = OsRng;
    rng.try_fill_bytes(&mut nonce_bytes)
        .map_err(|err| anyhow::anyhow!("random nonce failed: {err:?}"))?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|err| anyhow::anyhow!("encrypt failed: {err:?}"))?;
    Ok(EncryptedBlob {
        nonce: Base64.encode(nonce_bytes),
        ciphertext: Base64.encode(ciphertext),
    })
}

pub(crate) fn decrypt_string(blob: &EncryptedBlob, key: &[u8]) -> Result<String> {
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let nonce_bytes = Base64.decode(&blob.nonce).context("decode nonce")?;
    let ciphertext = Base64
        .decode(&blob.ciphertext)
        .context("decode ciphertext")?;
    let nonce = Nonce::from_slice(&nonce_bytes);
    let plaintext = cipher
        .decrypt(nonce, ciphertext.as_ref())
        .map_err(|err| anyhow::anyhow!("decrypt failed: {err:?}"))?;
    let text = String::from_utf8(plaintext).context("decode utf8")?;
    Ok(text)
}
