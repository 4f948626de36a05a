//! Issue commands

use clap::Subcommand;
use its_core::{Config, ItsAccessor, Secrets, TrackerKind};
use its_redmine::{ClientOptions, Issue, RedmineAccessor};
use tracing::debug;

use super::fields::FieldArgs;

/// Commands that talk to the tracker
#[derive(Subcommand, Debug)]
pub enum IssueCommand {
    /// List every issue of the project, open and closed
    #[command(visible_alias = "list")]
    Issues,

    /// Show issue details
    Show {
        /// Issue id
        id: u64,
    },

    /// Create an issue and print its id (-1 on failure)
    Create {
        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Update an existing issue
    Update {
        /// Issue id
        id: u64,

        /// Refuse the update unless the issue id equals this value
        #[arg(long)]
        expect_id: Option<String>,

        #[command(flatten)]
        fields: FieldArgs,
    },

    /// Print the most recent update time among the project's issues
    Latest,

    /// Print an id to subject map of the project's issues as JSON
    Subjects,

    /// Check that a custom field exists and accepts a value
    CheckField {
        /// Custom field id
        field_id: u64,

        /// Candidate value
        value: String,
    },
}

impl IssueCommand {
    /// Execute the command against the configured tracker
    pub async fn execute(&self, config: &Config) -> anyhow::Result<()> {
        let mut accessor = connect(config).await?;
        debug!(?accessor, "Connected");

        match self {
            IssueCommand::Issues => list_issues(&mut accessor).await,
            IssueCommand::Show { id } => show_issue(&mut accessor, *id).await,
            IssueCommand::Create { fields } => create_issue(&mut accessor, fields).await,
            IssueCommand::Update {
                id,
                expect_id,
                fields,
            } => update_issue(&mut accessor, *id, expect_id.as_deref(), fields).await,
            IssueCommand::Latest => latest_update(&mut accessor).await,
            IssueCommand::Subjects => subjects(&mut accessor).await,
            IssueCommand::CheckField { field_id, value } => {
                check_field(&accessor, *field_id, value).await
            }
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<RedmineAccessor> {
    let url = config.require_url()?;
    let project = config.require_project()?;

    let secrets = Secrets::load()?;
    let api_key = secrets.redmine_api_key().ok_or_else(|| {
        anyhow::anyhow!(
            "Redmine API key not found. Set REDMINE_API_KEY environment variable \
             or run `its init-secrets` and edit the generated file"
        )
    })?;

    let accessor = match config.tracker.kind {
        TrackerKind::Redmine => {
            RedmineAccessor::connect(project, url, &api_key, &ClientOptions::from(&config.tracker))
                .await?
        }
    };

    Ok(accessor.with_unknown_name_policy(config.tracker.unknown_names))
}

async fn require_project(accessor: &mut RedmineAccessor) -> anyhow::Result<()> {
    if !accessor.load_project().await {
        anyhow::bail!("Failed to load project '{}'", accessor.project_name());
    }
    Ok(())
}

async fn load_project_issues(accessor: &mut RedmineAccessor) -> anyhow::Result<Vec<Issue>> {
    let project = accessor.project_name().to_string();
    Ok(accessor.load_issues(&project).await?)
}

async fn list_issues(accessor: &mut RedmineAccessor) -> anyhow::Result<()> {
    let issues = load_project_issues(accessor).await?;

    if issues.is_empty() {
        println!("No issues found");
        return Ok(());
    }

    for issue in &issues {
        println!(
            "#{:<6} {:<12} {}",
            issue.id.unwrap_or_default(),
            ref_name(issue.status.as_ref()),
            issue.subject
        );
    }

    println!();
    println!("{} issue(s)", issues.len());
    Ok(())
}

async fn show_issue(accessor: &mut RedmineAccessor, id: u64) -> anyhow::Result<()> {
    let issue = accessor.load_issue(id).await?;

    println!("#{} {}", id, issue.subject);
    println!("================");
    println!("Project:     {}", ref_name(issue.project.as_ref()));
    println!("Tracker:     {}", ref_name(issue.tracker.as_ref()));
    println!("Status:      {}", ref_name(issue.status.as_ref()));
    println!("Priority:    {}", ref_name(issue.priority.as_ref()));
    println!("Assignee:    {}", ref_name(issue.assigned_to.as_ref()));
    println!("Version:     {}", ref_name(issue.fixed_version.as_ref()));
    if let Some(ref parent) = issue.parent {
        println!("Parent:      #{}", parent.id);
    }
    println!("Start date:  {}", display_opt(issue.start_date));
    println!("Due date:    {}", display_opt(issue.due_date));
    println!("Done:        {}%", issue.done_ratio.unwrap_or_default());
    println!("Estimated:   {}", display_opt(issue.estimated_hours));
    println!("Spent:       {}", display_opt(issue.total_spent_hours));
    println!("Updated:     {}", display_opt(issue.updated_on));

    if !issue.custom_fields.is_empty() {
        println!();
        println!("Custom fields:");
        for field in &issue.custom_fields {
            println!("  [{}] {}: {}", field.id, field.name, field.value);
        }
    }

    if let Some(ref description) = issue.description {
        if !description.is_empty() {
            println!();
            println!("{}", description);
        }
    }

    Ok(())
}

async fn create_issue(accessor: &mut RedmineAccessor, fields: &FieldArgs) -> anyhow::Result<()> {
    let data = fields.to_issue_data()?;
    require_project(accessor).await?;

    match accessor.create_issue(&data).await {
        Some(id) => {
            println!("{}", id);
            Ok(())
        }
        None => {
            println!("-1");
            anyhow::bail!("Issue creation failed (see log for details)")
        }
    }
}

async fn update_issue(
    accessor: &mut RedmineAccessor,
    id: u64,
    expect_id: Option<&str>,
    fields: &FieldArgs,
) -> anyhow::Result<()> {
    let mut data = fields.to_issue_data()?;
    if let Some(expected) = expect_id {
        data.id_check = Some(expected.to_string());
    }

    require_project(accessor).await?;
    let mut issue = accessor.load_issue(id).await?;

    if accessor.update_issue(&mut issue, &data).await {
        println!("updated");
        Ok(())
    } else {
        println!("failed");
        anyhow::bail!("Issue #{} was not updated (see log for details)", id)
    }
}

async fn latest_update(accessor: &mut RedmineAccessor) -> anyhow::Result<()> {
    load_project_issues(accessor).await?;

    match accessor.latest_update() {
        Some(updated) => println!("{}", updated.to_rfc3339()),
        None => println!("(no issues)"),
    }
    Ok(())
}

async fn subjects(accessor: &mut RedmineAccessor) -> anyhow::Result<()> {
    load_project_issues(accessor).await?;

    let map = accessor.id_to_subject();
    println!("{}", serde_json::to_string_pretty(&map)?);
    Ok(())
}

async fn check_field(accessor: &RedmineAccessor, field_id: u64, value: &str) -> anyhow::Result<()> {
    if accessor.has_custom_field(field_id, value).await? {
        println!("ok");
        Ok(())
    } else {
        anyhow::bail!(
            "Custom field {} does not exist or does not accept {:?}",
            field_id,
            value
        )
    }
}

fn ref_name(reference: Option<&its_redmine::NamedRef>) -> String {
    match reference {
        Some(r) => r.name.clone().unwrap_or_else(|| format!("#{}", r.id)),
        None => "-".to_string(),
    }
}

fn display_opt<T: std::fmt::Display>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}
