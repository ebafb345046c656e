use anyhow::Result;
use clap::{CommandFactory, Parser};
use color_eyre::config::HookBuilder;

mod handlers;
mod logging;
mod wizard;

/// gdpilot - Google Drive from your terminal
#[derive(Parser, Debug)]
#[command(name = "gdpilot")]
#[command(version)]
#[command(about = "Rust CLI to manage Google Drive folders and files from your terminal", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Initial setup (interactive wizard)
    Init,

    /// Manage the configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage the Google sign-in
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },

    /// Manage folders
    Folders {
        #[command(subcommand)]
        action: FolderAction,
    },

    /// Manage files
    Files {
        #[command(subcommand)]
        action: FileAction,
    },

    /// Convert between folder links and IDs
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },

    /// Shell completion
    Completion {
        /// Shell type (bash, zsh, fish, elvish, powershell)
        shell: String,
    },

    /// Diagnostics
    Doctor {
        #[command(subcommand)]
        action: DoctorAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Edit the configuration in $EDITOR
    Edit,
    /// Validate the configuration and the credentials file
    Validate,
}

#[derive(clap::Subcommand, Debug)]
enum AuthAction {
    /// Sign in with Google (opens the consent flow)
    Login,
    /// Show whether a usable token is stored
    Status,
    /// Forget the stored token
    Logout,
}

#[derive(clap::Subcommand, Debug)]
enum FolderAction {
    /// List the folders directly under a parent
    List {
        /// Parent folder ID or link (default parent when omitted)
        parent: Option<String>,
        /// Output format (table, json)
        #[arg(short, long, default_value = "table")]
        output: String,
    },
    /// Find a folder by name
    Find {
        /// Folder name
        name: String,
        /// Parent folder ID or link
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Create a folder
    Create {
        /// Folder name
        name: String,
        /// Parent folder ID or link
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Permanently delete a folder and everything in it
    Delete {
        /// Folder ID or link
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Print the whole folder hierarchy
    Tree,
}

#[derive(clap::Subcommand, Debug)]
enum FileAction {
    /// Find a file by name
    Find {
        /// File name
        name: String,
        /// Parent folder ID or link
        #[arg(short, long)]
        parent: Option<String>,
    },
    /// Upload a file to My Drive
    Upload {
        /// Local file to upload
        path: String,
        /// MIME type (guessed from the extension when omitted)
        #[arg(short, long)]
        mime: Option<String>,
    },
    /// Download a file (Google Docs, Sheets, Slides and Drawings are exported)
    Download {
        /// File ID
        id: String,
        /// Destination folder
        #[arg(short, long, default_value = ".")]
        dest: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum UrlAction {
    /// Extract the folder ID from a Drive link
    Id {
        /// Drive folder link
        url: String,
    },
    /// Build the Drive link of a folder
    Folder {
        /// Folder ID
        id: String,
    },
}

#[derive(clap::Subcommand, Debug)]
enum DoctorAction {
    /// Check the installation and the configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Setup error handling
    if let Err(e) = HookBuilder::default().install() {
        eprintln!("Warning: Failed to install error handler: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    // Logging follows the config file when there is a readable one
    let logging_config = gdpilot_core::load_config().ok().and_then(|c| c.logging);
    if let Err(e) = logging::init_logging(logging_config.as_ref(), cli.verbose) {
        eprintln!("Warning: {}", e);
    }

    // Execute command
    match cli.command {
        Commands::Init => handlers::handle_init().await,
        Commands::Config { action } => {
            let action_str = match action {
                ConfigAction::Show => "show",
                ConfigAction::Edit => "edit",
                ConfigAction::Validate => "validate",
            };
            handlers::handle_config(action_str).await
        }
        Commands::Auth { action } => {
            let action_str = match action {
                AuthAction::Login => "login",
                AuthAction::Status => "status",
                AuthAction::Logout => "logout",
            };
            handlers::handle_auth(action_str).await
        }
        Commands::Folders { action } => {
            let (action_str, target, parent, output, yes) = match action {
                FolderAction::List { parent, output } => ("list", None, parent, output, false),
                FolderAction::Find { name, parent } => ("find", Some(name), parent, String::new(), false),
                FolderAction::Create { name, parent } => ("create", Some(name), parent, String::new(), false),
                FolderAction::Delete { id, yes } => ("delete", Some(id), None, String::new(), yes),
                FolderAction::Tree => ("tree", None, None, String::new(), false),
            };
            handlers::handle_folders(action_str, target.as_deref(), parent.as_deref(), &output, yes).await
        }
        Commands::Files { action } => {
            let (action_str, target, parent, mime, dest) = match action {
                FileAction::Find { name, parent } => ("find", name, parent, None, None),
                FileAction::Upload { path, mime } => ("upload", path, None, mime, None),
                FileAction::Download { id, dest } => ("download", id, None, None, Some(dest)),
            };
            handlers::handle_files(action_str, &target, parent.as_deref(), mime.as_deref(), dest.as_deref()).await
        }
        Commands::Url { action } => {
            let (action_str, value) = match action {
                UrlAction::Id { url } => ("id", url),
                UrlAction::Folder { id } => ("folder", id),
            };
            handlers::handle_url(action_str, &value).await
        }
        Commands::Completion { shell } => {
            handlers::handle_completion(&shell, &mut Cli::command()).await
        }
        Commands::Doctor { action } => {
            let action_str = match action {
                DoctorAction::Check => "check",
            };
            handlers::handle_doctor(action_str).await
        }
    }
}
