//! Interactive setup wizard for gdpilot configuration

use anyhow::Result;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use gdpilot_core::auth::ClientSecrets;
use gdpilot_core::config::{get_config_path, get_default_token_dir, MAX_PAGE_SIZE, ROOT_FOLDER_ID};
use gdpilot_core::{extract_folder_id, save_config, ConfigFile, DriveConfig, LoggingConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Run the interactive setup wizard
pub async fn run_init_wizard() -> Result<()> {
    println!("🚀 Welcome to gdpilot setup!\n");

    println!("This wizard will guide you through the configuration process.");
    println!("You will need:");
    println!("  1. An OAuth client of type 'Desktop app' from the Google Cloud console");
    println!("  2. Its credentials.json file, downloaded locally\n");

    // Step 1: Credentials file
    let credentials_path = prompt_credentials_path()?;

    // Step 2: Token folder
    let default_token_dir = get_default_token_dir()?.display().to_string();
    let token_dir: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Folder for the saved sign-in token")
        .default(default_token_dir)
        .interact_text()?;

    // Step 3: Default parent folder
    let default_parent = prompt_default_parent()?;

    // Step 4: Page size
    let page_size = prompt_page_size()?;

    // Step 5: Log format
    let formats = vec!["compact", "pretty"];
    let format_index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Log format")
        .items(&formats)
        .default(0)
        .interact()?;

    // Summary
    println!("\n📋 Configuration summary:");
    println!("  Credentials: {}", credentials_path);
    println!("  Token folder: {}", token_dir);
    println!("  Default parent: {}", default_parent);
    println!("  Page size: {}", page_size);
    println!("  Log format: {}", formats[format_index]);

    // Confirmation
    let confirm = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Save this configuration?")
        .default(false)
        .interact()?;

    if !confirm {
        println!("❌ Configuration cancelled");
        return Ok(());
    }

    let config = ConfigFile {
        drive: DriveConfig {
            credentials_path,
            token_dir,
            default_parent,
            page_size,
            ..DriveConfig::default()
        },
        logging: Some(LoggingConfig {
            format: formats[format_index].to_string(),
            ..LoggingConfig::default()
        }),
    };

    // Save config
    let pb = ProgressBar::new(2);
    pb.set_style(
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] {msg}")?,
    );
    pb.set_message("Saving configuration...");

    save_config(&config)?;

    pb.inc(1);
    pb.finish_with_message("✅ Configuration saved!");

    println!("\n🎉 Setup complete!");
    println!("\nConfiguration saved to: {}", get_config_path()?.display());
    println!("\nYou can now use gdpilot:");
    println!("  $ gdpilot auth login");
    println!("  $ gdpilot folders list");
    println!("  $ gdpilot files upload report.pdf");

    Ok(())
}

/// Prompt for the OAuth client secrets file
fn prompt_credentials_path() -> Result<String> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Path to credentials.json")
        .default("credentials.json".to_string())
        .validate_with(|input: &String| -> Result<(), String> {
            if input.is_empty() {
                return Err("Path cannot be empty".to_string());
            }
            ClientSecrets::from_file(Path::new(input))
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(|e| anyhow::anyhow!("Failed to get credentials path: {}", e))
}

/// Prompt for the default parent folder (ID or link)
fn prompt_default_parent() -> Result<String> {
    let input: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Default parent folder (ID, link, or 'root' for My Drive)")
        .default(ROOT_FOLDER_ID.to_string())
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Parent folder cannot be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(|e| anyhow::anyhow!("Failed to get default parent: {}", e))?;

    if input.contains("drive.google.com/") {
        Ok(extract_folder_id(&input))
    } else {
        Ok(input.trim().to_string())
    }
}

/// Prompt for the listing page size
fn prompt_page_size() -> Result<u32> {
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Items per page when listing")
        .default(DriveConfig::default().page_size)
        .validate_with(|input: &u32| -> Result<(), String> {
            if *input == 0 || *input > MAX_PAGE_SIZE {
                Err(format!("Page size must be between 1 and {}", MAX_PAGE_SIZE))
            } else {
                Ok(())
            }
        })
        .interact_text()
        .map_err(|e| anyhow::anyhow!("Failed to get page size: {}", e))
}
