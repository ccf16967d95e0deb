//! Command-line surface for the `canopy` binary.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use canopy_core::lifecycle::{
    check_tmux_guard, run_attach, run_create, run_destroy, run_init, run_list, run_prune,
    run_start, run_stop, run_switch, run_sync, run_tree,
};
use canopy_core::scaffold::parse_lang_list;
use canopy_core::spawn::run_spawn;
use canopy_core::{Config, Language, SpawnArgs, StartOpts};

#[derive(Debug, Parser)]
#[command(
    name = "canopy",
    version,
    about = "Launch devcontainers for git projects and their worktrees"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Start modifiers used when no subcommand is given.
    #[command(flatten)]
    pub start: StartArgs,

    /// Verbose diagnostics on stderr.
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,
}

/// Modifiers shared by every start-capable command.
#[derive(Debug, Default, Clone, Args)]
pub struct StartArgs {
    /// Start an agent with this prompt instead of attaching.
    #[arg(short = 'p', long)]
    pub prompt: Option<String>,

    /// Agent to use (default: round-robin from config).
    #[arg(long)]
    pub agent: Option<String>,

    /// Recreate the container even if one is running.
    #[arg(long)]
    pub new: bool,

    /// Start the container and return without attaching.
    #[arg(short = 'd', long)]
    pub detach: bool,

    /// Open a shell in the container instead of tmux.
    #[arg(long)]
    pub shell: bool,

    /// Run one command in the container and exit.
    #[arg(long, value_name = "CMD")]
    pub run: Option<String>,

    /// Extra bind mount, `source:target[:ro]`. Repeatable.
    #[arg(long = "mount", value_name = "SPEC")]
    pub mounts: Vec<String>,

    /// Copy a host file into the workspace, `source[:target]`. Repeatable.
    #[arg(long = "copy", value_name = "SPEC")]
    pub copies: Vec<String>,
}

impl StartArgs {
    fn to_opts(&self) -> StartOpts {
        StartOpts {
            prompt: self.prompt.clone(),
            agent: self.agent.clone(),
            new: self.new,
            detach: self.detach,
            shell: self.shell,
            run: self.run.clone(),
            mounts: self.mounts.clone(),
            copies: self.copies.clone(),
        }
    }
}

/// Comma-separated language list for `--lang`, validated at parse time.
#[derive(Debug, Clone)]
pub struct LangList(pub Vec<Language>);

fn lang_list(value: &str) -> Result<LangList, String> {
    parse_lang_list(value).map(LangList)
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start or attach to this repository's devcontainer (the default).
    Start {
        #[command(flatten)]
        start: StartArgs,
    },

    /// Create a new project directory with git and a devcontainer.
    Create {
        /// Project name (becomes the directory name).
        name: String,

        /// Project languages, comma-separated (else an interactive picker).
        #[arg(long, value_parser = lang_list)]
        lang: Option<LangList>,

        #[command(flatten)]
        start: StartArgs,
    },

    /// Create or reuse a git worktree with its own devcontainer.
    Tree {
        /// Worktree/branch name (random when omitted).
        name: Option<String>,

        /// Base the new branch on this existing branch.
        #[arg(long = "from", value_name = "BRANCH")]
        from: Option<String>,

        #[command(flatten)]
        start: StartArgs,
    },

    /// Spawn N worktrees with containers, optionally one agent in each.
    Spawn {
        /// Number of workspaces to spawn.
        count: usize,

        /// Name worktrees `<n>-<prefix>` instead of random names.
        #[arg(long)]
        prefix: Option<String>,

        /// Base new branches on this existing branch.
        #[arg(long = "from", value_name = "BRANCH")]
        from: Option<String>,

        #[command(flatten)]
        start: StartArgs,
    },

    /// Show containers and worktrees for this project (or all with --all).
    List {
        /// All devcontainers on this host.
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Pick a running container and attach to it.
    Switch,

    /// Stop this workspace's container (or the whole project with --all).
    Stop {
        /// Every container of this project, worktrees first.
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Attach to the already-running container of this repository.
    Attach {
        /// Open a shell instead of tmux.
        #[arg(long)]
        shell: bool,

        /// Run one command and exit.
        #[arg(long, value_name = "CMD")]
        run: Option<String>,
    },

    /// Initialize git and a devcontainer in the current directory.
    Init {
        #[command(flatten)]
        start: StartArgs,
    },

    /// Regenerate .devcontainer/ from the current config.
    Sync {
        #[command(flatten)]
        start: StartArgs,
    },

    /// Remove stopped containers, orphans, and stale worktrees.
    Prune {
        /// All stopped devcontainers on this host.
        #[arg(short = 'a', long)]
        all: bool,
    },

    /// Stop and remove every container of a project, then its directories.
    Destroy {
        /// Project path (default: the current repository).
        path: Option<PathBuf>,

        /// Answer yes to every confirmation.
        #[arg(short = 'y', long)]
        yes: bool,
    },
}

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        None => {
            let opts = cli.start.to_opts();
            check_tmux_guard(&opts)?;
            run_start(&config, &opts)
        }
        Some(Command::Start { start }) => {
            let opts = start.to_opts();
            check_tmux_guard(&opts)?;
            run_start(&config, &opts)
        }
        Some(Command::Create { name, lang, start }) => {
            let opts = start.to_opts();
            check_tmux_guard(&opts)?;
            run_create(&config, &name, lang.map(|l| l.0), &opts)
        }
        Some(Command::Tree { name, from, start }) => {
            let opts = start.to_opts();
            check_tmux_guard(&opts)?;
            run_tree(&config, name, from, &opts)
        }
        Some(Command::Spawn { count, prefix, from, start }) => {
            let opts = start.to_opts();
            check_tmux_guard(&opts)?;
            let args = SpawnArgs { count, prefix, from_branch: from };
            run_spawn(&config, &args, &opts)
        }
        Some(Command::List { all }) => run_list(all),
        Some(Command::Switch) => {
            check_tmux_guard(&StartOpts::default())?;
            run_switch()
        }
        Some(Command::Stop { all }) => run_stop(all),
        Some(Command::Attach { shell, run }) => {
            let opts = StartOpts { shell, run: run.clone(), ..StartOpts::default() };
            check_tmux_guard(&opts)?;
            run_attach(shell, run)
        }
        Some(Command::Init { start }) => {
            let opts = start.to_opts();
            check_tmux_guard(&opts)?;
            run_init(&config, &opts)
        }
        Some(Command::Sync { start }) => {
            run_sync(&config)?;
            // --new continues into the start path after regenerating.
            if start.new {
                let opts = start.to_opts();
                check_tmux_guard(&opts)?;
                return run_start(&config, &opts);
            }
            Ok(())
        }
        Some(Command::Prune { all }) => run_prune(all),
        Some(Command::Destroy { path, yes }) => run_destroy(path, yes),
    }
}
