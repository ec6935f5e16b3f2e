use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

mod add;
mod cache_tree;
mod cat_file;
mod codec;
mod commit;
mod error;
mod hash;
mod hash_object;
mod index;
mod log;
mod ls_tree;
mod object;
mod object_store;
mod repo;
mod write_tree;

use error::Error;
use repo::{EnvConfigIdentity, Repository};

#[derive(Parser, Debug)]
#[command(name = "gfg", about = "A from-scratch, byte-compatible reimplementation of core git plumbing")]
pub struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an empty repository or reinitialise an existing one.
    Init,
    /// Stage one or more files.
    Add { paths: Vec<String> },
    /// Print an object's type, or its contents pretty-printed.
    CatFile {
        #[clap(short = 't')]
        show_type: bool,
        #[clap(short = 'p')]
        pretty_print: bool,
        /// `<object>` alone with -t/-p, or `<type> <object>` otherwise.
        args: Vec<String>,
    },
    /// Compute (and optionally store) a blob's object id.
    HashObject {
        #[clap(short = 'w')]
        write: bool,
        #[clap(long)]
        stdin: bool,
        file: Option<PathBuf>,
    },
    /// List the entries of a tree object.
    LsTree {
        #[clap(long)]
        name_only: bool,
        tree: String,
    },
    /// Write the staged index out as a tree object.
    WriteTree,
    /// Create a commit object from an explicit tree and parents.
    CommitTree {
        #[clap(short = 'm')]
        message: String,
        #[clap(short = 'p')]
        parents: Vec<String>,
        tree: String,
    },
    /// Run write-tree, then commit against HEAD.
    Commit {
        #[clap(short = 'm')]
        message: String,
    },
    /// Show commit history starting at HEAD.
    Log {
        #[clap(long)]
        no_color: bool,
    },
}

fn run() -> error::Result<()> {
    let args = Args::parse();
    let cwd = std::env::current_dir().map_err(|e| Error::io(".", e))?;

    match args.command {
        Command::Init => Repository::init(&cwd),
        Command::Add { paths } => {
            let repo = Repository::discover(&cwd)?;
            add::add(&repo, &paths)
        }
        Command::CatFile {
            show_type,
            pretty_print,
            args,
        } => {
            let repo = Repository::discover(&cwd)?;
            let store = repo.object_store();
            let usage = || {
                Error::InvalidArgument("usage: cat-file (-t | -p | <type>) <object>".into())
            };
            let (object, mode) = if show_type {
                let [object] = <[String; 1]>::try_from(args).map_err(|_| usage())?;
                (object, cat_file::Mode::Type)
            } else if pretty_print {
                let [object] = <[String; 1]>::try_from(args).map_err(|_| usage())?;
                (object, cat_file::Mode::PrettyPrint)
            } else {
                let [expected, object] = <[String; 2]>::try_from(args).map_err(|_| usage())?;
                (object, cat_file::Mode::Expect(expected))
            };
            cat_file::cat_file(&store, &object, mode)
        }
        Command::HashObject { write, stdin, file } => {
            let store = if write {
                Repository::discover(&cwd)?.object_store()
            } else {
                object_store::ObjectStore::new(cwd.join(".git/objects"))
            };
            let hash = if stdin {
                hash_object::hash_stdin(&store, write)?
            } else {
                let file = file.ok_or_else(|| {
                    Error::InvalidArgument("hash-object requires a file or --stdin".into())
                })?;
                hash_object::hash_file(&store, &file, write)?
            };
            println!("{}", hex::encode(hash));
            Ok(())
        }
        Command::LsTree { name_only, tree } => {
            let repo = Repository::discover(&cwd)?;
            let store = repo.object_store();
            ls_tree::ls_tree(&store, &tree, name_only)
        }
        Command::WriteTree => {
            let repo = Repository::discover(&cwd)?;
            let sha = write_tree::write_tree(&repo)?;
            println!("{}", hex::encode(sha));
            Ok(())
        }
        Command::CommitTree { message, parents, tree } => {
            let repo = Repository::discover(&cwd)?;
            let store = repo.object_store();
            let identity = EnvConfigIdentity { repo: &repo };
            let tree = store.resolve(&tree).map_err(|_| {
                Error::InvalidArgument(format!("not a valid object name {tree}"))
            })?;
            let mut resolved_parents = Vec::new();
            for parent in &parents {
                resolved_parents.push(store.resolve(parent).map_err(|_| {
                    Error::InvalidArgument(format!("not a valid object name {parent}"))
                })?);
            }
            let sha = commit::write_commit(&store, &identity, tree, resolved_parents, message)?;
            println!("{}", hex::encode(sha));
            Ok(())
        }
        Command::Commit { message } => {
            let repo = Repository::discover(&cwd)?;
            let identity = EnvConfigIdentity { repo: &repo };
            let sha = commit::commit(&repo, &identity, message)?;
            println!("{}", hex::encode(sha));
            Ok(())
        }
        Command::Log { no_color } => {
            let repo = Repository::discover(&cwd)?;
            log::log(&repo, no_color)
        }
    }
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}
