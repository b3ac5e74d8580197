//! AppService CLI - Command line interface for the AppService control plane.

use clap::{Parser, Subcommand};

use appservice_client::HttpClient;
use appservice_core::{AppId, StartParams, Task, TaskId, TaskParams};

/// AppService CLI - start apps and manage their tasks
#[derive(Parser)]
#[command(name = "appservice")]
#[command(about = "CLI for the AppService control plane", long_about = None)]
struct Cli {
    /// Control plane address
    #[arg(short, long, default_value = "http://[::1]:50052")]
    addr: String,

    /// User to act as
    #[arg(short, long)]
    user: Option<String>,

    /// Authorization token passed through to the executor
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show service and executor health
    Status,

    /// List available apps
    Apps,

    /// Start an app in a workspace
    Start {
        /// App ID
        app: String,

        /// Workspace the app writes to
        #[arg(short, long)]
        workspace: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Start an app with full start parameters
    Start2 {
        /// App ID
        app: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,

        /// Start parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        start_params: String,
    },

    /// Show several tasks
    Query {
        /// Task IDs
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Count tasks by state
    Summary,

    /// Show one task in detail
    Details {
        /// Task ID
        id: String,
    },

    /// List tasks in creation order
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,

        #[arg(long, default_value_t = 100)]
        count: usize,
    },

    /// Kill a task
    Kill {
        /// Task ID
        id: String,
    },

    /// Rerun a task under a new ID
    Rerun {
        /// Task ID
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut client = HttpClient::new(&cli.addr);
    if let Some(user) = cli.user {
        client = client.with_user(user);
    }
    if let Some(token) = cli.token {
        client = client.with_token(token);
    }

    match cli.command {
        Commands::Status => status(&client).await?,
        Commands::Apps => apps(&client).await?,
        Commands::Start {
            app,
            workspace,
            params,
        } => {
            let params = parse_params(&params)?;
            let task = client
                .start_app(&AppId::new(app), &params, &workspace)
                .await?;
            println!("Task started:");
            print_task(&task);
        }
        Commands::Start2 {
            app,
            params,
            start_params,
        } => {
            let params = parse_params(&params)?;
            let start_params: StartParams = serde_json::from_str(&start_params)?;
            let task = client
                .start_app2(&AppId::new(app), &params, &start_params)
                .await?;
            println!("Task started:");
            print_task(&task);
        }
        Commands::Query { ids } => {
            let ids: Vec<TaskId> = ids.into_iter().map(TaskId::new).collect();
            let found = client.query_tasks(&ids).await?;
            for id in &ids {
                match found.get(id) {
                    Some(task) => print_task(task),
                    None => println!("  {id}: not found"),
                }
            }
        }
        Commands::Summary => {
            let summary = client.query_task_summary().await?;
            println!("{:<10}  {}", "STATE", "COUNT");
            println!("{}", "-".repeat(20));
            for (state, count) in summary.iter() {
                println!("{:<10}  {}", state.as_str(), count);
            }
            println!("{:<10}  {}", "TOTAL", summary.total());
        }
        Commands::Details { id } => {
            let details = client.query_task_details(&TaskId::new(id)).await?;
            print_task(&details.task);
            if let Some(pid) = details.pid {
                println!("  PID:        {pid}");
            }
            if let Some(path) = &details.stdout_path {
                println!("  Stdout:     {path}");
            }
            if let Some(path) = &details.stderr_path {
                println!("  Stderr:     {path}");
            }
            if let Some(progress) = &details.progress {
                println!("  Executor:   {}", serde_json::to_string(progress)?);
            }
        }
        Commands::List { offset, count } => list_tasks(&client, offset, count).await?,
        Commands::Kill { id } => {
            let outcome = client.kill_task(&TaskId::new(id)).await?;
            println!("Killed: {} ({})", outcome.killed, outcome.message);
        }
        Commands::Rerun { id } => {
            let new_id = client.rerun_task(&TaskId::new(id)).await?;
            println!("Rerun started: {new_id}");
        }
    }

    Ok(())
}

async fn status(client: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    let records = client.service_status().await?;

    println!("{:<16}  {:<4}  {:<10}  {}", "SERVICE", "UP", "VERSION", "MESSAGE");
    println!("{}", "-".repeat(60));
    for record in records {
        println!(
            "{:<16}  {:<4}  {:<10}  {}",
            record.service,
            if record.up { "yes" } else { "no" },
            record.version.as_deref().unwrap_or("-"),
            record.message
        );
    }

    Ok(())
}

async fn apps(client: &HttpClient) -> Result<(), Box<dyn std::error::Error>> {
    let apps = client.enumerate_apps().await?;

    println!("Apps ({}):", apps.len());
    println!("{:<24}  {:<6}  {}", "ID", "PARAMS", "LABEL");
    println!("{}", "-".repeat(60));
    for app in apps {
        println!(
            "{:<24}  {:<6}  {}",
            app.id.as_str(),
            app.parameters.len(),
            app.label
        );
    }

    Ok(())
}

async fn list_tasks(
    client: &HttpClient,
    offset: usize,
    count: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let tasks = client.enumerate_tasks(offset, count).await?;

    println!("Tasks ({}):", tasks.len());
    println!("{:<36}  {:<10}  {:<16}  {}", "ID", "STATE", "APP", "SUBMITTED");
    println!("{}", "-".repeat(80));
    for task in tasks {
        println!(
            "{:<36}  {:<10}  {:<16}  {}",
            task.id.as_str(),
            task.state.as_str(),
            task.app.as_str(),
            format_timestamp(task.submitted_at)
        );
    }

    Ok(())
}

fn parse_params(raw: &str) -> Result<TaskParams, Box<dyn std::error::Error>> {
    match serde_json::from_str::<serde_json::Value>(raw)? {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err("params must be a JSON object".into()),
    }
}

fn print_task(task: &Task) {
    println!("  ID:         {}", task.id);
    println!("  App:        {}", task.app);
    println!("  State:      {}", task.state);
    println!("  Submitted:  {}", format_timestamp(task.submitted_at));

    if let Some(owner) = &task.owner {
        println!("  Owner:      {owner}");
    }
    if let Some(workspace) = &task.start_params.workspace {
        println!("  Workspace:  {workspace}");
    }
    if let Some(completed) = task.completed_at {
        println!("  Completed:  {}", format_timestamp(completed));
    }
    if let Some(error) = &task.error {
        println!("  Error:      {error}");
    }
    if let Some(original) = &task.rerun_of {
        println!("  Rerun of:   {original}");
    }
}

fn format_timestamp(at: chrono::DateTime<chrono::Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S").to_string()
}
