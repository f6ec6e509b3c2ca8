mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::Ctx;

#[derive(Parser)]
#[command(
    name = "stint",
    version,
    about = "Module tracking: time-boxed issue groupings with derived statistics"
)]
struct Cli {
    /// Path to the database file (default: .stint/stint.db in current dir)
    #[arg(long, env = "STINT_DB")]
    db: Option<PathBuf>,

    /// Workspace scope for every operation
    #[arg(long, env = "STINT_WORKSPACE", default_value = "default")]
    workspace: String,

    /// Project scope for every operation
    #[arg(long, env = "STINT_PROJECT", default_value = "default")]
    project: String,

    /// Acting user id (recorded on activity events, used for favorites)
    #[arg(long, env = "STINT_ACTOR", default_value = "cli")]
    actor: String,

    /// Output as JSON instead of table
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database and register the project
    Init {
        /// Project display name
        #[arg(long, default_value = "Default project")]
        name: String,
    },
    /// Create a seed user
    User {
        /// Display name
        name: String,
        #[arg(long)]
        first_name: Option<String>,
        #[arg(long)]
        last_name: Option<String>,
    },
    /// Create an issue state
    State {
        /// State name
        name: String,
        /// State group (backlog, unstarted, started, completed, cancelled)
        #[arg(long)]
        group: Option<String>,
    },
    /// Create a label
    Label {
        /// Label name
        name: String,
        #[arg(long)]
        color: Option<String>,
    },
    /// Issue operations
    Issue {
        #[command(subcommand)]
        action: IssueAction,
    },
    /// Module operations
    Module {
        #[command(subcommand)]
        action: ModuleAction,
    },
    /// Attach issues to a module
    Attach {
        /// Module ID
        module: String,
        /// Issue IDs
        #[arg(required = false)]
        issues: Vec<String>,
    },
    /// Attach one issue to several modules
    AttachModules {
        /// Issue ID
        issue: String,
        /// Module IDs
        #[arg(required = false)]
        modules: Vec<String>,
    },
    /// Detach one issue from a module
    Detach {
        /// Module ID
        module: String,
        /// Issue ID
        issue: String,
    },
    /// Favorite operations (acting user scoped)
    Favorite {
        #[command(subcommand)]
        action: FavoriteAction,
    },
    /// Saved per-user filters and display settings
    Props {
        #[command(subcommand)]
        action: PropsAction,
    },
    /// Web links attached to a module
    Link {
        #[command(subcommand)]
        action: LinkAction,
    },
}

#[derive(Subcommand)]
enum IssueAction {
    /// Create an issue
    Create {
        /// Issue name
        name: String,
        /// State ID
        #[arg(long)]
        state: Option<String>,
        /// Assignee user IDs
        #[arg(long)]
        assignee: Vec<String>,
        /// Label IDs
        #[arg(long)]
        label: Vec<String>,
        /// Create as draft (drafts never count toward module statistics)
        #[arg(long)]
        draft: bool,
    },
    /// Mark an issue completed now
    Complete {
        /// Issue ID
        id: String,
    },
    /// Archive an issue (archived issues never count toward statistics)
    Archive {
        /// Issue ID
        id: String,
    },
}

#[derive(Subcommand)]
enum ModuleAction {
    /// Create a module
    Create {
        /// Module name
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start_date: Option<String>,
        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target_date: Option<String>,
        /// Status (backlog, planned, in-progress, paused, completed, cancelled)
        #[arg(short, long)]
        status: Option<String>,
        /// Lead user ID
        #[arg(long)]
        lead: Option<String>,
        /// Member user IDs
        #[arg(long)]
        member: Vec<String>,
        /// Idempotency source for integrations
        #[arg(long)]
        external_source: Option<String>,
        /// Idempotency id for integrations
        #[arg(long)]
        external_id: Option<String>,
    },
    /// List modules (favorites first, then newest)
    List {
        /// Comma-separated projection of output fields (implies JSON)
        #[arg(long)]
        fields: Option<String>,
    },
    /// Show full module detail with distributions and burndown
    Show {
        /// Module ID
        id: String,
    },
    /// Partially update a module
    Update {
        /// Module ID
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(long)]
        start_date: Option<String>,
        #[arg(long)]
        target_date: Option<String>,
        #[arg(short, long)]
        status: Option<String>,
        #[arg(long)]
        lead: Option<String>,
        #[arg(long)]
        sort_order: Option<f64>,
    },
    /// Delete a module and its issue links
    Delete {
        /// Module ID
        id: String,
    },
}

#[derive(Subcommand)]
enum FavoriteAction {
    /// Favorite a module
    Add { module: String },
    /// Remove a favorite
    Remove { module: String },
}

#[derive(Subcommand)]
enum PropsAction {
    /// Show (and lazily create) the acting user's saved properties
    Show { module: String },
    /// Patch the acting user's saved properties
    Set {
        module: String,
        /// Filters blob (JSON)
        #[arg(long)]
        filters: Option<String>,
        /// Display filters blob (JSON)
        #[arg(long)]
        display_filters: Option<String>,
        /// Display properties blob (JSON)
        #[arg(long)]
        display_properties: Option<String>,
    },
}

#[derive(Subcommand)]
enum LinkAction {
    /// Attach a URL to a module
    Add {
        module: String,
        url: String,
        #[arg(long)]
        title: Option<String>,
    },
    /// List a module's URLs, newest first
    List { module: String },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let db_path = match cli.db {
        Some(path) => path,
        None => match std::env::current_dir() {
            Ok(dir) => dir.join(".stint").join("stint.db"),
            Err(e) => {
                eprintln!("error: cannot determine current directory: {e}");
                std::process::exit(1);
            }
        },
    };

    let ctx = Ctx {
        db_path,
        workspace: cli.workspace,
        project: cli.project,
        actor: cli.actor,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Init { name } => commands::init::run(&ctx, &name),
        Commands::User {
            name,
            first_name,
            last_name,
        } => commands::seed::add_user(&ctx, &name, first_name.as_deref(), last_name.as_deref()),
        Commands::State { name, group } => commands::seed::add_state(&ctx, &name, group.as_deref()),
        Commands::Label { name, color } => commands::seed::add_label(&ctx, &name, color.as_deref()),
        Commands::Issue { action } => match action {
            IssueAction::Create {
                name,
                state,
                assignee,
                label,
                draft,
            } => commands::issue::create(&ctx, &name, state.as_deref(), &assignee, &label, draft),
            IssueAction::Complete { id } => commands::issue::complete(&ctx, &id),
            IssueAction::Archive { id } => commands::issue::archive(&ctx, &id),
        },
        Commands::Module { action } => match action {
            ModuleAction::Create {
                name,
                description,
                start_date,
                target_date,
                status,
                lead,
                member,
                external_source,
                external_id,
            } => commands::module::create(
                &ctx,
                &name,
                description.as_deref(),
                start_date.as_deref(),
                target_date.as_deref(),
                status.as_deref(),
                lead.as_deref(),
                &member,
                external_source.as_deref(),
                external_id.as_deref(),
            ),
            ModuleAction::List { fields } => commands::module::list(&ctx, fields.as_deref()),
            ModuleAction::Show { id } => commands::module::show(&ctx, &id),
            ModuleAction::Update {
                id,
                name,
                description,
                start_date,
                target_date,
                status,
                lead,
                sort_order,
            } => commands::module::update(
                &ctx,
                &id,
                name.as_deref(),
                description.as_deref(),
                start_date.as_deref(),
                target_date.as_deref(),
                status.as_deref(),
                lead.as_deref(),
                sort_order,
            ),
            ModuleAction::Delete { id } => commands::module::delete(&ctx, &id),
        },
        Commands::Attach { module, issues } => commands::attach::issues(&ctx, &module, &issues),
        Commands::AttachModules { issue, modules } => {
            commands::attach::modules(&ctx, &issue, &modules)
        }
        Commands::Detach { module, issue } => commands::attach::detach(&ctx, &module, &issue),
        Commands::Favorite { action } => match action {
            FavoriteAction::Add { module } => commands::favorite::add(&ctx, &module),
            FavoriteAction::Remove { module } => commands::favorite::remove(&ctx, &module),
        },
        Commands::Props { action } => match action {
            PropsAction::Show { module } => commands::props::show(&ctx, &module),
            PropsAction::Set {
                module,
                filters,
                display_filters,
                display_properties,
            } => commands::props::set(
                &ctx,
                &module,
                filters.as_deref(),
                display_filters.as_deref(),
                display_properties.as_deref(),
            ),
        },
        Commands::Link { action } => match action {
            LinkAction::Add { module, url, title } => {
                commands::weblink::add(&ctx, &module, &url, title.as_deref())
            }
            LinkAction::List { module } => commands::weblink::list(&ctx, &module),
        },
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
