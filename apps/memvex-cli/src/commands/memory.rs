// memory.rs — Memory subcommands: add, list, recall, forget, clear.

use std::path::Path;

use clap::Subcommand;
use memvex_memory::{MemoryEntry, MemoryQuery, NewMemory, DEFAULT_RECALL_LIMIT};

use super::{fmt_time, load_state, parse_id, truncate};

#[derive(Subcommand)]
pub enum MemoryCommands {
    /// Store a memory.
    Add {
        /// The text to remember.
        content: String,
        /// Namespace (e.g., work, project:atlas).
        #[arg(short, long)]
        namespace: Option<String>,
        /// Comma-separated tags.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Agent name recorded on the memory.
        #[arg(long, default_value = "cli")]
        agent: String,
    },
    /// List memories, newest first.
    List {
        /// Only this namespace.
        #[arg(short, long)]
        namespace: Option<String>,
    },
    /// Search memories by text.
    Recall {
        /// Words to search for.
        query: String,
        /// Only this namespace.
        #[arg(short, long)]
        namespace: Option<String>,
        /// Maximum number of results.
        #[arg(short, long, default_value_t = DEFAULT_RECALL_LIMIT)]
        limit: usize,
        /// Only memories carrying one of these comma-separated tags.
        #[arg(short, long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Delete one memory.
    Forget {
        /// Memory id.
        id: String,
    },
    /// Delete every memory, or every memory in one namespace.
    Clear {
        /// Only this namespace.
        #[arg(short, long)]
        namespace: Option<String>,
    },
}

pub fn execute(cmd: &MemoryCommands, config_path: &Path) -> anyhow::Result<()> {
    let state = load_state(config_path)?;
    let memory = state.memory()?;

    match cmd {
        MemoryCommands::Add {
            content,
            namespace,
            tags,
            agent,
        } => {
            let mut new = NewMemory::new(content.as_str()).agent(agent.as_str());
            if let Some(ns) = namespace {
                new = new.namespace(ns.as_str());
            }
            if !tags.is_empty() {
                new = new.tags(tags.iter().map(String::as_str));
            }
            let entry = memory.store(new)?;
            println!("Stored {}", entry.id);
        }

        MemoryCommands::List { namespace } => {
            let entries = memory.list(namespace.as_deref())?;
            if entries.is_empty() {
                println!("No memories.");
                return Ok(());
            }
            print_table(&entries);
            println!();
            println!("{} memory(ies).", entries.len());
        }

        MemoryCommands::Recall {
            query,
            namespace,
            limit,
            tags,
        } => {
            let mut q = MemoryQuery::new(query.as_str())
                .limit(*limit)
                .tags(tags.iter().map(String::as_str));
            if let Some(ns) = namespace {
                q = q.namespace(ns.as_str());
            }
            let hits = memory.recall(q)?;
            if hits.is_empty() {
                println!("No memories match '{}'.", query);
                return Ok(());
            }
            print_table(&hits);
        }

        MemoryCommands::Forget { id } => {
            let uuid = parse_id(id)?;
            if memory.forget(uuid)? {
                println!("Forgot {}", uuid);
            } else {
                anyhow::bail!("no memory with id {}", uuid);
            }
        }

        MemoryCommands::Clear { namespace } => {
            let removed = memory.clear(namespace.as_deref())?;
            match namespace {
                Some(ns) => println!("Removed {} memory(ies) from '{}'.", removed, ns),
                None => println!("Removed {} memory(ies).", removed),
            }
        }
    }

    Ok(())
}

fn print_table(entries: &[MemoryEntry]) {
    println!(
        "{:<38} {:<20} {:<16} {:<10} CONTENT",
        "ID", "CREATED", "NAMESPACE", "AGENT"
    );
    println!("{}", "-".repeat(110));
    for entry in entries {
        let tags = match &entry.tags {
            Some(tags) if !tags.is_empty() => format!(" [{}]", tags.join(", ")),
            _ => String::new(),
        };
        println!(
            "{:<38} {:<20} {:<16} {:<10} {}{}",
            entry.id.to_string(),
            fmt_time(&entry.created_at),
            truncate(entry.namespace.as_deref().unwrap_or("-"), 16),
            truncate(entry.agent.as_deref().unwrap_or("-"), 10),
            truncate(&entry.content, 60),
            tags
        );
    }
}
