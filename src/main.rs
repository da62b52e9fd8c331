mod ai;
mod error;
mod models;
mod registry;
mod session;
mod stats;
mod store;
mod workflow;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use ai::{GeminiAnalyzer, ResumeAnalyzer};
use models::Status;
use session::Session;
use store::RtdbStore;
use workflow::{ListFilter, SortKey, SubmissionForm};

#[derive(Parser)]
#[command(name = "sift")]
#[command(about = "Resume intake and AI screening over a shared applicant database")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a resume to a company's job posting
    Submit {
        /// Applicant's full name
        #[arg(short, long)]
        name: String,

        /// Applicant's email address
        #[arg(short, long)]
        email: String,

        /// Company to apply to (see 'sift companies')
        #[arg(short, long)]
        company: String,

        /// Job posting to apply for (see 'sift job list')
        #[arg(short, long)]
        job: String,

        /// Path to the resume PDF
        resume: PathBuf,
    },

    /// List registered companies accepting applications
    Companies,

    /// List applications for the signed-in company
    List {
        /// Filter by status (Pending, Approved, Rejected)
        #[arg(short, long)]
        status: Option<String>,

        /// Case-insensitive search over name, email, and job
        #[arg(long)]
        search: Option<String>,

        /// Sort by name, job, rating, or status
        #[arg(long)]
        sort: Option<String>,
    },

    /// Show one application in full
    Show {
        /// Application key
        key: String,
    },

    /// Set an application's review status
    Status {
        /// Application key
        key: String,

        /// New status (Pending, Approved, Rejected)
        status: String,
    },

    /// Delete an application
    Delete {
        /// Application key
        key: String,
    },

    /// Save an application's resume back to a PDF file
    Resume {
        /// Application key
        key: String,

        /// Output path (defaults to <key>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show application statistics for the signed-in company
    Stats,

    /// Check store connectivity and show record counts
    Info,

    /// Register a company account
    Signup {
        /// Company display name, shown to applicants
        #[arg(short, long)]
        company: String,

        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Sign in as a company
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Sign out
    Logout,

    /// Change the signed-in company's password
    Passwd {
        /// Current password
        #[arg(long)]
        old: String,

        /// New password
        #[arg(long)]
        new: String,
    },

    /// Manage the signed-in company's job postings
    Job {
        #[command(subcommand)]
        command: JobCommands,
    },
}

#[derive(Subcommand)]
enum JobCommands {
    /// List postings
    List,

    /// Add a posting
    Add {
        /// Job title
        name: String,

        /// Comma-separated keywords the AI scores resumes against
        keywords: String,
    },

    /// Remove a posting by key
    Remove {
        /// Posting key (see 'sift job list')
        key: String,
    },
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match cli.command {
        Commands::Submit {
            name,
            email,
            company,
            job,
            resume,
        } => {
            let store = RtdbStore::from_env()?;
            let analyzer = GeminiAnalyzer::new()?;
            println!(
                "Analyzing {} with {}...",
                resume.display(),
                analyzer.model_name()
            );

            let outcome = workflow::submit_application(
                &store,
                &analyzer,
                &SubmissionForm {
                    full_name: &name,
                    email: &email,
                    company: &company,
                    job: &job,
                    resume: &resume,
                },
            )?;

            println!("Application submitted (key: {})", outcome.key);
            println!("Rating: {}/100", outcome.rating);
        }

        Commands::Companies => {
            let store = RtdbStore::from_env()?;
            let names = registry::company_names(&store)?;
            if names.is_empty() {
                println!("No companies registered yet.");
            } else {
                for name in names {
                    println!("{}", name);
                }
            }
        }

        Commands::List {
            status,
            search,
            sort,
        } => {
            let sess = current_session()?;
            let store = RtdbStore::from_env()?;

            let status = status.as_deref().map(parse_status).transpose()?;
            let sort = sort.as_deref().map(parse_sort).transpose()?;
            let filter = ListFilter {
                search: search.as_deref(),
                status,
                sort,
            };

            let rows = workflow::list_applications(&store, &sess.company_name, &filter)?;
            if rows.is_empty() {
                println!("No applications found.");
            } else {
                println!(
                    "{:<22} {:<22} {:<22} {:<10} {:>6}",
                    "KEY", "NAME", "JOB", "STATUS", "RATING"
                );
                println!("{}", "-".repeat(86));
                for (key, record) in &rows {
                    println!(
                        "{:<22} {:<22} {:<22} {:<10} {:>6}",
                        truncate(key, 20),
                        truncate(&record.full_name, 20),
                        truncate(&record.job, 20),
                        truncate(&record.status, 10),
                        record.rating_or_default()
                    );
                }
                println!("\n{} application(s)", rows.len());
            }
        }

        Commands::Show { key } => {
            let sess = current_session()?;
            let store = RtdbStore::from_env()?;
            match workflow::fetch_application(&store, &key)? {
                Some(record) if record.company == sess.company_name => {
                    println!("Application {}", key);
                    println!("Name: {}", record.full_name);
                    println!("Email: {}", record.email);
                    println!("Job: {}", record.job);
                    println!("Status: {}", record.status);
                    println!("Rating: {}/100", record.rating_or_default());
                    println!("\n--- Summary ---");
                    for line in textwrap::fill(&record.summary, 78).lines() {
                        println!("{}", line);
                    }
                }
                Some(_) => {
                    println!("Application {} belongs to another company.", key);
                }
                None => {
                    println!("Application {} not found.", key);
                }
            }
        }

        Commands::Status { key, status } => {
            let _sess = current_session()?;
            let store = RtdbStore::from_env()?;
            let applied = workflow::set_status(&store, &key, &status)?;
            println!("Marked {} as {}.", key, applied);
        }

        Commands::Delete { key } => {
            let _sess = current_session()?;
            let store = RtdbStore::from_env()?;
            workflow::delete_application(&store, &key)?;
            println!("Deleted application {}.", key);
        }

        Commands::Resume { key, output } => {
            let _sess = current_session()?;
            let store = RtdbStore::from_env()?;
            let record = workflow::fetch_application(&store, &key)?
                .ok_or_else(|| anyhow!("Application {} not found", key))?;
            let bytes = workflow::decode_resume(&record)?;

            let out_path = output.unwrap_or_else(|| PathBuf::from(format!("{}.pdf", key)));
            std::fs::write(&out_path, bytes)
                .with_context(|| format!("Failed to write to {}", out_path.display()))?;
            println!("Resume saved to: {}", out_path.display());
        }

        Commands::Stats => {
            let sess = current_session()?;
            let store = RtdbStore::from_env()?;
            let snapshot = stats::compute_stats(&store, &sess.company_name)?;

            println!("Applications for {}", sess.company_name);
            println!("  Total:      {}", snapshot.total);
            println!("  Pending:    {}", snapshot.pending);
            println!("  Approved:   {}", snapshot.approved);
            println!("  Rejected:   {}", snapshot.rejected);
            println!("  Avg rating: {:.1}/100", snapshot.avg_rating);
            if snapshot.total > 0 {
                println!(
                    "  Acceptance: {:.0}%",
                    snapshot.approved as f64 / snapshot.total as f64 * 100.0
                );
            }

            let rows = workflow::list_applications(
                &store,
                &sess.company_name,
                &ListFilter::default(),
            )?;
            if !rows.is_empty() {
                println!("\nRecent applications:");
                for (_, record) in rows.iter().rev().take(5) {
                    println!("  {} - {} ({})", record.full_name, record.job, record.status);
                }
            }

            println!(
                "\nSnapshot taken {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
            );
        }

        Commands::Info => {
            let store = RtdbStore::from_env()?;
            let summary = stats::store_summary(&store)?;
            println!("Store reachable.");
            println!("  Applications: {}", summary.applications);
            println!("  Companies:    {}", summary.companies);
            println!("  Job postings: {}", summary.postings);
        }

        Commands::Signup {
            company,
            email,
            password,
        } => {
            let store = RtdbStore::from_env()?;
            registry::signup(&store, &company, &email, &password)?;
            println!("Account created for {}. You can now log in.", company);
        }

        Commands::Login { email, password } => {
            let store = RtdbStore::from_env()?;
            let company = registry::login(&store, &email, &password)?;
            session::save(&Session {
                company_name: company.company_name.clone(),
                email: company.email.clone(),
                password: company.password.clone(),
            })?;
            println!("Signed in as {}.", company.company_name);
        }

        Commands::Logout => {
            session::clear()?;
            println!("Signed out.");
        }

        Commands::Passwd { old, new } => {
            let sess = current_session()?;
            let store = RtdbStore::from_env()?;
            registry::change_password(&store, &sess.email, &old, &new)?;
            println!("Password changed.");
        }

        Commands::Job { command } => {
            let sess = current_session()?;
            let store = RtdbStore::from_env()?;
            match command {
                JobCommands::List => {
                    let postings = registry::postings_for(&store, &sess.company_name)?;
                    if postings.is_empty() {
                        println!("No postings found.");
                    } else {
                        println!("{:<22} {:<26} {:<30}", "KEY", "TITLE", "KEYWORDS");
                        println!("{}", "-".repeat(78));
                        for (key, posting) in postings {
                            println!(
                                "{:<22} {:<26} {:<30}",
                                truncate(&key, 20),
                                truncate(&posting.name, 24),
                                truncate(&posting.value, 28)
                            );
                        }
                    }
                }

                JobCommands::Add { name, keywords } => {
                    let key =
                        registry::add_posting(&store, &sess.company_name, &name, &keywords)?;
                    println!("Added posting '{}' (key: {})", name, key);
                }

                JobCommands::Remove { key } => {
                    registry::remove_posting(&store, &key)?;
                    println!("Removed posting {}.", key);
                }
            }
        }
    }

    Ok(())
}

fn current_session() -> Result<Session> {
    session::load().ok_or_else(|| anyhow!("Not signed in. Run 'sift login' first."))
}

fn parse_status(s: &str) -> Result<Status> {
    s.parse().map_err(|_| {
        anyhow!(
            "unknown status '{}' (expected Pending, Approved, or Rejected)",
            s
        )
    })
}

fn parse_sort(s: &str) -> Result<SortKey> {
    match s.to_lowercase().as_str() {
        "name" => Ok(SortKey::Name),
        "job" => Ok(SortKey::Job),
        "rating" => Ok(SortKey::Rating),
        "status" => Ok(SortKey::Status),
        _ => Err(anyhow!(
            "unknown sort key '{}' (expected name, job, rating, or status)",
            s
        )),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
