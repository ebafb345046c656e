//! Command handlers for gdpilot CLI

use crate::wizard::run_init_wizard;
use anyhow::{anyhow, Context, Result};
use clap::Command;
use clap_complete::{generate, Shell as ClapShell};
use dialoguer::{theme::ColorfulTheme, Confirm};
use gdpilot_core::auth::ClientSecrets;
use gdpilot_core::{
    config_exists, extract_folder_id, folder_url, format_tree, get_config_path, load_config, mime,
    validate_config, ClientConfig, Config, DriveClient, FileTokenStore, HttpDriveApi,
    InstalledFlow, TokenStore,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tabled::{Table, Tabled};
use tracing::debug;

/// Handle init command
pub async fn handle_init() -> Result<()> {
    run_init_wizard().await
}

/// Load and validate the config file, with a hint when it is missing
fn load_client_config() -> Result<(Config, ClientConfig)> {
    let config = load_config().context("No usable configuration (run 'gdpilot init')")?;
    let client_config = ClientConfig::from_file_config(&config.drive)?;
    Ok((config, client_config))
}

fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

/// Client whose consent URL is printed above the spinner
fn build_client(client_config: ClientConfig, pb: &ProgressBar) -> Result<DriveClient> {
    let printer = pb.clone();
    let authenticator = InstalledFlow::new(client_config.credentials_path.clone(), client_config.redirect_port)
        .with_prompt(Arc::new(move |url: &str| {
            printer.println("Open this URL in your browser to authorize gdpilot:");
            printer.println(format!("  {}", url));
        }));
    let api = HttpDriveApi::new(&client_config.application_name)?;
    let token_store = FileTokenStore::new(&client_config.token_dir);

    Ok(DriveClient::with_parts(
        client_config,
        Arc::new(api),
        Arc::new(authenticator),
        Arc::new(token_store),
    )?)
}

/// Authorized client built from the config file
async fn connect() -> Result<DriveClient> {
    let (_, client_config) = load_client_config()?;
    debug!(
        credentials = %client_config.credentials_path.display(),
        token_dir = %client_config.token_dir.display(),
        "Connecting"
    );
    let pb = spinner("Connecting to Google Drive...")?;

    let client = build_client(client_config, &pb)?;
    let outcome = client.authorize().await;
    pb.finish_and_clear();
    outcome?;

    Ok(client)
}

/// Accept either a folder ID or a Drive folder link
fn folder_id_arg(value: &str) -> String {
    if value.contains("drive.google.com/") {
        extract_folder_id(value)
    } else {
        value.to_string()
    }
}

fn parent_or_default(parent: Option<&str>, client: &DriveClient) -> String {
    parent
        .map(folder_id_arg)
        .unwrap_or_else(|| client.config().default_parent.clone())
}

/// Handle config commands
pub async fn handle_config(action: &str) -> Result<()> {
    match action {
        "show" => {
            println!("Current configuration:");
            println!();

            let config = load_config()?;

            println!("Drive:");
            println!("  Credentials: {}", config.drive.credentials_path);
            println!("  Token folder: {}", config.drive.token_dir);
            println!("  Application name: {}", config.drive.application_name);
            println!("  Default parent: {}", config.drive.default_parent);
            println!("  Page size: {}", config.drive.page_size);
            println!("  Max pages: {}", config.drive.max_pages);
            println!("  Authorization timeout: {}s", config.drive.auth_timeout_secs);
            println!(
                "  Redirect port: {}",
                match config.drive.redirect_port {
                    0 => "any free port".to_string(),
                    port => port.to_string(),
                }
            );

            if let Some(logging) = &config.logging {
                println!();
                println!("Logging:");
                println!("  Level: {}", logging.level);
                println!("  Format: {}", logging.format);
            }

            Ok(())
        }
        "validate" => {
            println!("Validating configuration...");

            let config = load_config()?;

            validate_config(&config)?;
            println!("  ✅ Valid configuration format");

            let client_config = ClientConfig::from_file_config(&config.drive)?;
            let secrets = ClientSecrets::from_file(&client_config.credentials_path)?;
            println!("  ✅ Credentials file readable (client {})", short_id(&secrets.client_id));

            Ok(())
        }
        "edit" => {
            let config_path = get_config_path()?;
            println!("Opening editor...");
            println!("  File: {}", config_path.display());
            println!();

            let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

            let status = std::process::Command::new(editor)
                .arg(&config_path)
                .status()?;

            if status.success() {
                println!("  ✅ Configuration edited");

                // Validate after edit
                let config = load_config()?;
                validate_config(&config)?;
                println!("  ✅ Configuration valid");
            } else {
                println!("  ⚠️  Editor exited with error");
            }

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: show, edit, validate");
            Ok(())
        }
    }
}

/// Handle auth commands
pub async fn handle_auth(action: &str) -> Result<()> {
    let (_, client_config) = load_client_config()?;

    match action {
        "login" => {
            println!("Signing in to Google Drive...");

            connect().await?;
            println!("  ✅ Signed in");
            println!("  Token saved in {}", client_config.token_dir.display());

            Ok(())
        }
        "status" => {
            let store = FileTokenStore::new(&client_config.token_dir);

            match store.load().await? {
                None => println!("  ⚠️  Not signed in (run 'gdpilot auth login')"),
                Some(tokens) => {
                    println!("  ✅ Signed in");
                    println!("  Token file: {}", store.path().display());
                    println!(
                        "  Access token expires: {}",
                        tokens.expires_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M")
                    );
                    if tokens.is_stale() {
                        println!("  Access token is stale, it will be refreshed on next use");
                    }
                    if tokens.refresh_token.is_none() {
                        println!("  ⚠️  No refresh token stored, you will have to sign in again once it expires");
                    }
                }
            }

            Ok(())
        }
        "logout" => {
            let pb = spinner("Signing out...")?;
            let client = build_client(client_config, &pb)?;
            client.sign_out().await?;
            pb.finish_and_clear();

            println!("  ✅ Signed out, stored token removed");

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: login, status, logout");
            Ok(())
        }
    }
}

#[derive(Tabled)]
struct FolderRow {
    name: String,
    id: String,
}

/// Handle folders commands
pub async fn handle_folders(
    action: &str,
    target: Option<&str>,
    parent: Option<&str>,
    output: &str,
    yes: bool,
) -> Result<()> {
    let client = connect().await?;
    let page_size = client.config().page_size;

    match action {
        "list" => {
            let parent = parent_or_default(parent, &client);
            let folders = client.list_folders(&parent, page_size).await?;

            match output {
                "json" => {
                    let items: Vec<_> = folders
                        .iter()
                        .map(|(id, name)| serde_json::json!({ "id": id, "name": name }))
                        .collect();
                    println!("{}", serde_json::to_string_pretty(&items)?);
                }
                _ => {
                    println!("Folders in {}...", parent);

                    if folders.is_empty() {
                        println!("  No folders found");
                    } else {
                        let rows: Vec<FolderRow> = folders
                            .into_iter()
                            .map(|(id, name)| FolderRow { name, id })
                            .collect();

                        println!();
                        println!("{}", Table::new(rows));
                    }
                }
            }

            Ok(())
        }
        "find" => {
            let name = target.ok_or_else(|| anyhow!("Folder name required"))?;
            let parent = parent_or_default(parent, &client);

            match client.find_folder_id(name, &parent).await? {
                Some(id) => {
                    println!("  ✅ Found '{}'", name);
                    println!("  ID: {}", id);
                    println!("  URL: {}", folder_url(&id));
                }
                None => println!("  ⚠️  No folder named '{}' in {}", name, parent),
            }

            Ok(())
        }
        "create" => {
            let name = target.ok_or_else(|| anyhow!("Folder name required"))?;
            let parent = parent_or_default(parent, &client);

            println!("Creating folder '{}' in {}...", name, parent);
            let id = client.create_folder(name, &parent).await?;

            println!("  ✅ Folder created");
            println!("  ID: {}", id);
            println!("  URL: {}", folder_url(&id));

            Ok(())
        }
        "delete" => {
            let id = folder_id_arg(target.ok_or_else(|| anyhow!("Folder ID required"))?);

            if !yes {
                println!("⚠️  Warning: folder '{}' and everything in it will be deleted permanently", id);
                let confirmed = Confirm::with_theme(&ColorfulTheme::default())
                    .with_prompt("Delete it?")
                    .default(false)
                    .interact()?;
                if !confirmed {
                    println!("❌ Deletion cancelled");
                    return Ok(());
                }
            }

            if client.delete_folder(&id).await? {
                println!("  ✅ Folder deleted");
            } else {
                println!("  ⚠️  '{}' is not a folder, nothing was deleted", id);
            }

            Ok(())
        }
        "tree" => {
            let pb = spinner("Fetching folders...")?;
            let lines = client.folder_tree(page_size).await;
            pb.finish_and_clear();

            print!("{}", format_tree(&lines?));

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: list, find, create, delete, tree");
            Ok(())
        }
    }
}

/// Handle files commands
pub async fn handle_files(
    action: &str,
    target: &str,
    parent: Option<&str>,
    mime_type: Option<&str>,
    dest: Option<&str>,
) -> Result<()> {
    match action {
        "find" => {
            let client = connect().await?;
            let parent = parent_or_default(parent, &client);

            match client.find_file_id(target, &parent).await? {
                Some(id) => {
                    println!("  ✅ Found '{}'", target);
                    println!("  ID: {}", id);
                }
                None => println!("  ⚠️  No file named '{}' in {}", target, parent),
            }

            Ok(())
        }
        "upload" => {
            let path = Path::new(target);
            if !path.is_file() {
                return Err(anyhow!("File not found: {}", target));
            }

            // Detect content type
            let content_type = mime_type
                .map(str::to_string)
                .unwrap_or_else(|| mime::guess_from_path(path));
            let file_size = path.metadata()?.len();

            let client = connect().await?;

            println!("Uploading {}...", target);
            println!("  Size: {}", format_bytes(file_size));
            println!("  Type: {}", content_type);

            let pb = spinner("Uploading...")?;
            let outcome = client.upload_path(path, &content_type).await;
            pb.finish_and_clear();
            let id = outcome?;

            println!("  ✅ Upload complete");
            println!("  ID: {}", id);

            Ok(())
        }
        "download" => {
            let dest = dest.unwrap_or(".");
            let client = connect().await?;

            println!("Downloading {} -> {}...", target, dest);

            let pb = spinner("Downloading...")?;
            let outcome = client.download(target, dest).await;
            pb.finish_and_clear();
            let path = outcome?;

            let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            println!("  ✅ Download complete");
            println!("  Saved to: {} ({})", path.display(), format_bytes(size));

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: find, upload, download");
            Ok(())
        }
    }
}

/// Handle url commands (offline)
pub async fn handle_url(action: &str, value: &str) -> Result<()> {
    match action {
        "id" => {
            println!("{}", extract_folder_id(value));
            Ok(())
        }
        "folder" => {
            println!("{}", folder_url(value));
            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: id, folder");
            Ok(())
        }
    }
}

/// Handle doctor commands
pub async fn handle_doctor(action: &str) -> Result<()> {
    match action {
        "check" => {
            println!("Checking gdpilot installation...");

            println!("  ✅ gdpilot is installed");
            println!("  Version: {}", env!("CARGO_PKG_VERSION"));

            // Check config
            if !config_exists() {
                println!("  ⚠️  Configuration not found (run 'gdpilot init')");
                return Ok(());
            }
            println!("  ✅ Configuration found");

            let config = load_config()?;
            validate_config(&config)?;
            println!("  ✅ Configuration valid");

            let client_config = ClientConfig::from_file_config(&config.drive)?;
            match ClientSecrets::from_file(&client_config.credentials_path) {
                Ok(_) => println!("  ✅ Credentials file found"),
                Err(e) => println!("  ⚠️  {}", e),
            }

            let store = FileTokenStore::new(&client_config.token_dir);
            match store.load().await {
                Ok(Some(_)) => println!("  ✅ Signed in"),
                Ok(None) => println!("  ⚠️  Not signed in (run 'gdpilot auth login')"),
                Err(e) => println!("  ⚠️  Stored token unreadable: {}", e),
            }

            Ok(())
        }
        _ => {
            println!("Unknown action: {}", action);
            println!("Available actions: check");
            Ok(())
        }
    }
}

/// First characters of an identifier, enough to recognize it
fn short_id(id: &str) -> String {
    match id.char_indices().nth(12) {
        Some((end, _)) => format!("{}...", &id[..end]),
        None => id.to_string(),
    }
}

/// Format bytes to human-readable size
fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// Handle shell completion generation
pub async fn handle_completion(shell: &str, cmd: &mut Command) -> Result<()> {
    use std::io;

    let clap_shell = match shell {
        "bash" => ClapShell::Bash,
        "zsh" => ClapShell::Zsh,
        "fish" => ClapShell::Fish,
        "elvish" => ClapShell::Elvish,
        "powershell" | "pwsh" => ClapShell::PowerShell,
        _ => {
            return Err(anyhow!(
                "Unsupported shell: {}\nSupported shells: bash, zsh, fish, elvish, powershell",
                shell
            ));
        }
    };

    // Script only on stdout so `source <(gdpilot completion bash)` works
    generate(clap_shell, cmd, "gdpilot", &mut io::stdout());

    eprintln!();
    eprintln!("✅ Completion generated!");
    eprintln!();
    eprintln!("Installation instructions:");

    match shell {
        "bash" => {
            eprintln!("  # Add to your ~/.bashrc:");
            eprintln!("  source <(gdpilot completion bash)");
            eprintln!();
            eprintln!("  # Or for permanent installation:");
            eprintln!("  gdpilot completion bash > ~/.local/share/bash-completion/completions/gdpilot");
        }
        "zsh" => {
            eprintln!("  # Add to your ~/.zshrc:");
            eprintln!("  source <(gdpilot completion zsh)");
            eprintln!();
            eprintln!("  # Or for permanent installation:");
            eprintln!("  gdpilot completion zsh > ~/.zsh/completion/_gdpilot");
            eprintln!("  # then add to ~/.zshrc:");
            eprintln!("  fpath=(~/.zsh/completion $fpath)");
            eprintln!("  autoload -U compinit && compinit");
        }
        "fish" => {
            eprintln!("  gdpilot completion fish > ~/.config/fish/completions/gdpilot.fish");
        }
        "elvish" => {
            eprintln!("  gdpilot completion elvish > ~/.elvish/lib/gdpilot.elv");
            eprintln!("  # then add to rc.elv:");
            eprintln!("  use ~/.elvish/lib/gdpilot");
        }
        "powershell" | "pwsh" => {
            eprintln!("  # Run in PowerShell:");
            eprintln!("  gdpilot completion powershell | Out-String | Invoke-Expression");
            eprintln!();
            eprintln!("  # Or add to your PowerShell Profile:");
            eprintln!("  gdpilot completion powershell > $PROFILE");
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512.00 B");
        assert_eq!(format_bytes(1536), "1.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn test_folder_id_arg() {
        assert_eq!(folder_id_arg("1AbC"), "1AbC");
        assert_eq!(
            folder_id_arg("https://drive.google.com/drive/folders/1AbC?usp=sharing"),
            "1AbC"
        );
        assert_eq!(folder_id_arg("https://drive.google.com/drive/my-drive"), "root");
    }

    #[test]
    fn test_short_id() {
        assert_eq!(short_id("123.apps.googleusercontent.com"), "123.apps.goo...");
        assert_eq!(short_id("abc"), "abc");
    }
}
