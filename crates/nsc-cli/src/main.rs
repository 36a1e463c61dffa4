//! nsc CLI — `nsc` command.
//!
//! Creates operators, accounts and users, edits their claims, and
//! generates activation tokens and user credentials.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, Parser, Subcommand};

use nsc_core::activation::{import_from_token, read_token_source};
use nsc_core::config::Config;
use nsc_core::editor::{AccountLimit, ClaimEdit, Direction, UserLimit};
use nsc_core::jwt::{format_jwt, Export, ExportKind, Import, ResponseType};
use nsc_core::prompt::{AnswerSource, TerminalAnswers};
use nsc_core::resolver::{resolve_key, resolve_signer};
use nsc_core::storage::fs::write_atomic;
use nsc_core::time::describe as describe_time;
use nsc_core::{
    generate_activation, ActivationRequest, AddOptions, Claims, Clock, EntityRef, KeyPair,
    KeyRole, Level, SystemClock, TrustStore,
};

// ── CLI structure ─────────────────────────────────────────────────────────────

/// nsc — manage operators, accounts and users and the credentials that
/// link them.
#[derive(Parser, Debug)]
#[command(
    name = "nsc",
    about = "nsc — NATS account and credential tool",
    version,
    long_about = "nsc — NATS account and credential tool\n\nCreate operators, accounts and users, edit their signed claims,\nand generate activation tokens and user credentials."
)]
struct Cli {
    /// Config file (default: ~/.nsc/nsc.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Signing key: a seed, or a path to a file holding one
    #[arg(short = 'K', long = "private-key", global = true)]
    private_key: Option<String>,

    /// Ask questions for various settings
    #[arg(short, long, global = true)]
    interactive: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create an operator (or operator-less store) with an account and user
    Init {
        /// Name used for the operator, account and user
        #[arg(long)]
        name: String,

        /// Create a store without an operator; accounts sign themselves
        #[arg(long)]
        operator_less: bool,
    },

    /// Add an operator, account, user, export or import
    Add {
        #[command(subcommand)]
        subcommand: AddCommands,
    },

    /// Edit an operator, account or user claim
    Edit {
        #[command(subcommand)]
        subcommand: EditCommands,
    },

    /// Describe an operator, account or user
    Describe {
        #[command(subcommand)]
        subcommand: DescribeCommands,
    },

    /// Generate activation tokens and user credentials
    Generate {
        #[command(subcommand)]
        subcommand: GenerateCommands,
    },

    /// Show or set the current operator and account
    Env {
        /// Make this operator current
        #[arg(long)]
        operator: Option<String>,

        /// Make this account current
        #[arg(long)]
        account: Option<String>,
    },

    /// List keys and entities
    List {
        #[command(subcommand)]
        subcommand: ListCommands,
    },
}

/// Validity window flags shared by add and edit.
#[derive(Args, Debug, Default, Clone)]
struct ValidityArgs {
    /// Valid from ('0' is always, '2h' is 2 hours, or YYYY-MM-DD)
    #[arg(long)]
    start: Option<String>,

    /// Valid until ('0' is always, '2M' is 2 months, or YYYY-MM-DD)
    #[arg(long)]
    expiry: Option<String>,
}

#[derive(Subcommand, Debug)]
enum AddCommands {
    /// Add an operator
    Operator {
        #[arg(long)]
        name: Option<String>,

        /// Operator public key or seed (default: generate)
        #[arg(long)]
        public_key: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        /// Tags (comma separated, repeatable)
        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Add an account to the current operator
    Account {
        #[arg(long)]
        name: Option<String>,

        /// Operator name (default: current)
        #[arg(long)]
        operator: Option<String>,

        /// Account public key or seed (default: generate)
        #[arg(long)]
        public_key: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Add a user to the current account
    User {
        #[arg(long)]
        name: Option<String>,

        /// Account name (default: current)
        #[arg(long)]
        account: Option<String>,

        /// Operator name (default: current)
        #[arg(long)]
        operator: Option<String>,

        /// User public key or seed (default: generate)
        #[arg(long)]
        public_key: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,
    },

    /// Add an export to an account
    Export {
        /// Account name (default: current)
        #[arg(long)]
        account: Option<String>,

        /// Subject to export (wildcards allowed)
        #[arg(long)]
        subject: String,

        #[arg(long)]
        name: Option<String>,

        /// Export a service instead of a stream
        #[arg(long)]
        service: bool,

        /// Require an activation token to import
        #[arg(long)]
        private: bool,

        /// Service response type (singleton, stream, chunked)
        #[arg(long)]
        response_type: Option<String>,
    },

    /// Add an import to an account
    Import {
        /// Importing account name (default: current)
        #[arg(long)]
        account: Option<String>,

        /// Activation token: inline, a file, or an http(s) URL
        #[arg(long)]
        token: Option<String>,

        /// Exporting account public key (public exports)
        #[arg(long)]
        src_account: Option<String>,

        /// Exported subject (public exports)
        #[arg(long)]
        remote_subject: Option<String>,

        /// Local subject to map the import to
        #[arg(long)]
        local_subject: Option<String>,

        /// Import a service instead of a stream (public exports)
        #[arg(long)]
        service: bool,

        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum EditCommands {
    /// Edit the operator claim
    Operator {
        /// Operator name (default: current)
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long = "rm-tag", value_delimiter = ',')]
        rm_tags: Vec<String>,

        /// Add a signing key
        #[arg(long = "sk")]
        signing_keys: Vec<String>,

        /// Remove a signing key
        #[arg(long = "rm-sk")]
        rm_signing_keys: Vec<String>,
    },

    /// Edit an account claim
    Account {
        /// Account name (default: current)
        #[arg(long)]
        name: Option<String>,

        /// Operator name (default: current)
        #[arg(long)]
        operator: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long = "rm-tag", value_delimiter = ',')]
        rm_tags: Vec<String>,

        #[arg(long = "sk")]
        signing_keys: Vec<String>,

        #[arg(long = "rm-sk")]
        rm_signing_keys: Vec<String>,

        /// Max connections (-1 or 'unlimited' for no limit)
        #[arg(long, allow_hyphen_values = true)]
        conns: Option<String>,

        /// Max subscriptions
        #[arg(long, allow_hyphen_values = true)]
        subscriptions: Option<String>,

        /// Max imports
        #[arg(long, allow_hyphen_values = true)]
        imports: Option<String>,

        /// Max exports
        #[arg(long, allow_hyphen_values = true)]
        exports: Option<String>,

        /// Max data in bytes (accepts k, M, G suffixes)
        #[arg(long, allow_hyphen_values = true)]
        data: Option<String>,

        /// Max message payload in bytes
        #[arg(long, allow_hyphen_values = true)]
        payload: Option<String>,

        /// Allow wildcard exports
        #[arg(long)]
        wildcard_exports: Option<bool>,

        /// Remove the export with this subject
        #[arg(long)]
        rm_export: Vec<String>,

        /// Remove the import with this subject
        #[arg(long)]
        rm_import: Vec<String>,
    },

    /// Edit a user claim
    User {
        /// User name
        #[arg(long)]
        name: Option<String>,

        /// Account name (default: current)
        #[arg(long)]
        account: Option<String>,

        /// Operator name (default: current)
        #[arg(long)]
        operator: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        #[arg(long = "tag", value_delimiter = ',')]
        tags: Vec<String>,

        #[arg(long = "rm-tag", value_delimiter = ',')]
        rm_tags: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        allow_pub: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        allow_sub: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        deny_pub: Vec<String>,

        #[arg(long, value_delimiter = ',')]
        deny_sub: Vec<String>,

        /// Remove publish permissions for these subjects
        #[arg(long, value_delimiter = ',')]
        rm_pub: Vec<String>,

        /// Remove subscribe permissions for these subjects
        #[arg(long, value_delimiter = ',')]
        rm_sub: Vec<String>,

        /// Max subscriptions
        #[arg(long, allow_hyphen_values = true)]
        subs: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        data: Option<String>,

        #[arg(long, allow_hyphen_values = true)]
        payload: Option<String>,
    },
}

/// Output options shared by describe commands.
#[derive(Args, Debug, Default, Clone)]
struct DescribeArgs {
    /// Print the decoded claim as JSON
    #[arg(long)]
    json: bool,

    /// Print the encoded token
    #[arg(long)]
    raw: bool,
}

#[derive(Subcommand, Debug)]
enum DescribeCommands {
    /// Describe an operator
    Operator {
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        output: DescribeArgs,
    },

    /// Describe an account
    Account {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        operator: Option<String>,

        #[command(flatten)]
        output: DescribeArgs,
    },

    /// Describe a user
    User {
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        account: Option<String>,

        #[arg(long)]
        operator: Option<String>,

        #[command(flatten)]
        output: DescribeArgs,
    },
}

#[derive(Subcommand, Debug)]
enum GenerateCommands {
    /// Generate an activation token for a private export
    Activation {
        /// Exporting account (default: current)
        #[arg(long)]
        account: Option<String>,

        /// Export subject, or a narrower subject of a wildcard export
        #[arg(long)]
        subject: Option<String>,

        /// Importing account public key, or a file holding it
        #[arg(long)]
        target_account: Option<String>,

        #[command(flatten)]
        validity: ValidityArgs,

        /// Write the token to this file instead of stdout
        #[arg(long)]
        output_file: Option<PathBuf>,
    },

    /// Generate a credentials file for a user
    Creds {
        /// User name
        #[arg(long)]
        name: String,

        /// Account name (default: current)
        #[arg(long)]
        account: Option<String>,

        /// Operator name (default: current)
        #[arg(long)]
        operator: Option<String>,

        /// Write the credentials to this file instead of stdout
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ListCommands {
    /// List stored keys
    Keys,
    /// List operators
    Operators,
    /// List accounts of the current operator
    Accounts,
    /// List users of the current account
    Users {
        #[arg(long)]
        account: Option<String>,
    },
}

// ── Command context ───────────────────────────────────────────────────────────

/// Everything a command needs besides its own flags.
struct Ctx<'a> {
    config: Config,
    private_key: Option<String>,
    interactive: bool,
    clock: &'a dyn Clock,
}

impl Ctx<'_> {
    fn open_store(&self) -> Result<TrustStore> {
        Ok(self.config.open_store()?)
    }

    fn operator(&self, store: &TrustStore, explicit: Option<&str>) -> Result<String> {
        let name = match explicit.or(self.config.operator.as_deref()) {
            Some(reference) => store.resolve_operator(reference)?,
            None => store.current_operator()?,
        };
        Ok(name)
    }

    fn account(&self, store: &TrustStore, operator: &str, explicit: Option<&str>) -> Result<String> {
        let name = match explicit {
            Some(reference) => store.resolve_account(operator, reference)?,
            None => store.current_account(operator)?,
        };
        Ok(name)
    }

    /// The `-K` key, checked against the role that may sign `entity`.
    fn signer_for(&self, store: &TrustStore, entity: &EntityRef) -> Result<Option<KeyPair>> {
        let role = match entity.level() {
            Level::Operator => KeyRole::Operator,
            Level::Account => {
                if store.store_info(entity.operator_name())?.has_operator {
                    KeyRole::Operator
                } else {
                    KeyRole::Account
                }
            }
            Level::User => KeyRole::Account,
        };
        Ok(resolve_signer(self.private_key.as_deref(), role)?)
    }
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let result = Config::load(cli.config.as_deref())
        .map_err(anyhow::Error::from)
        .and_then(|config| {
            let ctx = Ctx {
                config,
                private_key: cli.private_key.clone(),
                interactive: cli.interactive,
                clock: &SystemClock,
            };
            let mut answers = TerminalAnswers::stdio();
            run(&ctx, cli.command, &mut answers)
        });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(ctx: &Ctx<'_>, command: Commands, answers: &mut dyn AnswerSource) -> Result<()> {
    match command {
        Commands::Init {
            name,
            operator_less,
        } => cmd_init(ctx, &name, operator_less),
        Commands::Add { subcommand } => match subcommand {
            AddCommands::Operator {
                name,
                public_key,
                validity,
                tags,
            } => cmd_add_operator(ctx, name, public_key.as_deref(), &validity, tags),
            AddCommands::Account {
                name,
                operator,
                public_key,
                validity,
                tags,
            } => cmd_add_account(
                ctx,
                answers,
                name,
                operator.as_deref(),
                public_key.as_deref(),
                &validity,
                tags,
            ),
            AddCommands::User {
                name,
                account,
                operator,
                public_key,
                validity,
                tags,
            } => cmd_add_user(
                ctx,
                answers,
                name,
                operator.as_deref(),
                account.as_deref(),
                public_key.as_deref(),
                &validity,
                tags,
            ),
            AddCommands::Export {
                account,
                subject,
                name,
                service,
                private,
                response_type,
            } => cmd_add_export(
                ctx,
                account.as_deref(),
                &subject,
                name,
                service,
                private,
                response_type.as_deref(),
            ),
            AddCommands::Import {
                account,
                token,
                src_account,
                remote_subject,
                local_subject,
                service,
                name,
            } => cmd_add_import(
                ctx,
                account.as_deref(),
                ImportSource {
                    token,
                    src_account,
                    remote_subject,
                    service,
                },
                local_subject,
                name,
            ),
        },
        Commands::Edit { subcommand } => cmd_edit(ctx, subcommand),
        Commands::Describe { subcommand } => cmd_describe(ctx, subcommand),
        Commands::Generate { subcommand } => match subcommand {
            GenerateCommands::Activation {
                account,
                subject,
                target_account,
                validity,
                output_file,
            } => cmd_generate_activation(
                ctx,
                answers,
                ActivationRequest {
                    account,
                    subject,
                    target_account: target_account.unwrap_or_default(),
                    start: validity.start.unwrap_or_default(),
                    expiry: validity.expiry.unwrap_or_default(),
                    signer: None,
                    output: output_file,
                },
            ),
            GenerateCommands::Creds {
                name,
                account,
                operator,
                output_file,
            } => cmd_generate_creds(
                ctx,
                &name,
                operator.as_deref(),
                account.as_deref(),
                output_file.as_deref(),
            ),
        },
        Commands::Env { operator, account } => {
            cmd_env(ctx, operator.as_deref(), account.as_deref())
        }
        Commands::List { subcommand } => cmd_list(ctx, subcommand),
    }
}

// ── Command implementations ───────────────────────────────────────────────────

/// `nsc init --name NAME [--operator-less]`
fn cmd_init(ctx: &Ctx<'_>, name: &str, operator_less: bool) -> Result<()> {
    let store = ctx.config.create_store()?;
    if operator_less {
        store.init_store(name)?;
    } else {
        store.add_operator(&AddOptions::named(name), ctx.clock)?;
    }
    let account = store.add_account(name, &AddOptions::named(name), ctx.clock)?;
    let user = store.add_user(name, name, &AddOptions::named(name), ctx.clock)?;

    println!("Initialized store '{name}' in {}", store.root().display());
    if operator_less {
        println!("  Operator: none (accounts are self-signed)");
    }
    println!("  Account:  {name} ({})", account.sub);
    println!("  User:     {name} ({})", user.sub);
    Ok(())
}

/// `nsc add operator --name NAME`
fn cmd_add_operator(
    ctx: &Ctx<'_>,
    name: Option<String>,
    public_key: Option<&str>,
    validity: &ValidityArgs,
    tags: Vec<String>,
) -> Result<()> {
    let store = ctx.config.create_store()?;
    let name = name.ok_or_else(|| anyhow!("operator name is required"))?;
    let key = match resolve_key(public_key, KeyRole::Operator)? {
        Some(k) => Some(k),
        None => resolve_signer(ctx.private_key.as_deref(), KeyRole::Operator)?,
    };
    let opts = AddOptions {
        key,
        start: validity.start.clone().unwrap_or_default(),
        expiry: validity.expiry.clone().unwrap_or_default(),
        tags,
        ..AddOptions::named(name)
    };
    let claims = store.add_operator(&opts, ctx.clock)?;
    print_added(Level::Operator, &claims);
    Ok(())
}

/// `nsc add account --name NAME`
fn cmd_add_account(
    ctx: &Ctx<'_>,
    answers: &mut dyn AnswerSource,
    name: Option<String>,
    operator: Option<&str>,
    public_key: Option<&str>,
    validity: &ValidityArgs,
    tags: Vec<String>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let operator = ctx.operator(&store, operator)?;
    let entity = EntityRef::account(&operator, name.clone().unwrap_or_default());
    let mut opts = AddOptions {
        key: resolve_key(public_key, KeyRole::Account)?,
        signer: ctx.signer_for(&store, &entity)?,
        start: validity.start.clone().unwrap_or_default(),
        expiry: validity.expiry.clone().unwrap_or_default(),
        tags,
        ..AddOptions::named(name.unwrap_or_default())
    };
    if ctx.interactive {
        ask_add_options(answers, Level::Account, &mut opts)?;
    }
    let claims = store.add_account(&operator, &opts, ctx.clock)?;
    print_added(Level::Account, &claims);
    Ok(())
}

/// `nsc add user --name NAME [--account ACCOUNT] [--operator OPERATOR]`
fn cmd_add_user(
    ctx: &Ctx<'_>,
    answers: &mut dyn AnswerSource,
    name: Option<String>,
    operator: Option<&str>,
    account: Option<&str>,
    public_key: Option<&str>,
    validity: &ValidityArgs,
    tags: Vec<String>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let operator = ctx.operator(&store, operator)?;
    let account = ctx.account(&store, &operator, account)?;
    let entity = EntityRef::user(&operator, &account, name.clone().unwrap_or_default());
    let mut opts = AddOptions {
        key: resolve_key(public_key, KeyRole::User)?,
        signer: ctx.signer_for(&store, &entity)?,
        start: validity.start.clone().unwrap_or_default(),
        expiry: validity.expiry.clone().unwrap_or_default(),
        tags,
        ..AddOptions::named(name.unwrap_or_default())
    };
    if ctx.interactive {
        ask_add_options(answers, Level::User, &mut opts)?;
    }
    let claims = store.add_user(&operator, &account, &opts, ctx.clock)?;
    print_added(Level::User, &claims);
    Ok(())
}

/// Ask for the name, key and validity window of a new entity.
fn ask_add_options(
    answers: &mut dyn AnswerSource,
    level: Level,
    opts: &mut AddOptions,
) -> Result<()> {
    opts.name = answers.text(&format!("{level} name"), &opts.name)?;
    if opts.key.is_none() && !answers.confirm(&format!("generate an nkey for the {level}"), true)? {
        let source = answers.text(&format!("{level} nkey, or path to one"), "")?;
        opts.key = resolve_key(Some(&source), level.key_role())?;
    }
    let start = if opts.start.is_empty() { "0" } else { opts.start.as_str() };
    opts.start = answers.text("valid from ('0' is always, '2h' is 2 hours)", start)?;
    let expiry = if opts.expiry.is_empty() { "0" } else { opts.expiry.as_str() };
    opts.expiry = answers.text("valid until ('0' is always, '2M' is 2 months)", expiry)?;
    Ok(())
}

fn print_added(level: Level, claims: &Claims) {
    println!("Added {level} '{}'", claims.name);
    println!("  Key:     {}", claims.sub);
    println!("  Issuer:  {}", claims.iss);
    if claims.nbf.is_some() || claims.exp.is_some() {
        println!(
            "  Valid:   {} until {}",
            describe_time(claims.nbf, "now"),
            describe_time(claims.exp, "never")
        );
    }
}

/// `nsc add export --subject SUBJECT [--private] [--service]`
fn cmd_add_export(
    ctx: &Ctx<'_>,
    account: Option<&str>,
    subject: &str,
    name: Option<String>,
    service: bool,
    private: bool,
    response_type: Option<&str>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let operator = ctx.operator(&store, None)?;
    let account = ctx.account(&store, &operator, account)?;
    let entity = EntityRef::account(&operator, &account);

    let kind = if service {
        ExportKind::Service
    } else {
        ExportKind::Stream
    };
    let mut export = Export::new(subject, kind, private);
    export.name = name.unwrap_or_else(|| subject.to_string());
    export.response_type = response_type.map(parse_response_type).transpose()?;

    let signer = ctx.signer_for(&store, &entity)?;
    store.edit_claim(&entity, &[ClaimEdit::AddExport(export)], signer.as_ref(), ctx.clock)?;
    println!(
        "Added {} {kind} export '{subject}' to account '{account}'",
        if private { "private" } else { "public" }
    );
    Ok(())
}

fn parse_response_type(s: &str) -> Result<ResponseType> {
    match s.to_lowercase().as_str() {
        "singleton" => Ok(ResponseType::Singleton),
        "stream" => Ok(ResponseType::Stream),
        "chunked" => Ok(ResponseType::Chunked),
        other => Err(anyhow!(
            "invalid response type '{other}' (expected singleton, stream or chunked)"
        )),
    }
}

/// Where an import comes from.
struct ImportSource {
    token: Option<String>,
    src_account: Option<String>,
    remote_subject: Option<String>,
    service: bool,
}

/// `nsc add import (--token SRC | --src-account KEY --remote-subject SUBJECT)`
fn cmd_add_import(
    ctx: &Ctx<'_>,
    account: Option<&str>,
    source: ImportSource,
    local_subject: Option<String>,
    name: Option<String>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let operator = ctx.operator(&store, None)?;
    let account = ctx.account(&store, &operator, account)?;
    let entity = EntityRef::account(&operator, &account);
    let importer = store.read_claim(&entity)?;

    let mut import = match (source.token, source.src_account, source.remote_subject) {
        (Some(token), _, _) => {
            let token = read_token_source(&token).context("failed to load activation token")?;
            import_from_token(&token, &importer.sub, ctx.clock.now())?
        }
        (None, Some(src), Some(subject)) => Import {
            name: subject.clone(),
            subject,
            account: src,
            token: None,
            to: None,
            kind: if source.service {
                ExportKind::Service
            } else {
                ExportKind::Stream
            },
        },
        _ => bail!("an import needs --token, or --src-account with --remote-subject"),
    };
    import.to = local_subject;
    if let Some(name) = name {
        import.name = name;
    }

    let subject = import.subject.clone();
    let signer = ctx.signer_for(&store, &entity)?;
    store.edit_claim(&entity, &[ClaimEdit::AddImport(import)], signer.as_ref(), ctx.clock)?;
    println!("Added import '{subject}' to account '{account}'");
    Ok(())
}

/// `nsc edit operator|account|user ...`
fn cmd_edit(ctx: &Ctx<'_>, subcommand: EditCommands) -> Result<()> {
    let store = ctx.open_store()?;
    let (entity, edits) = match subcommand {
        EditCommands::Operator {
            name,
            validity,
            tags,
            rm_tags,
            signing_keys,
            rm_signing_keys,
        } => {
            let operator = ctx.operator(&store, name.as_deref())?;
            let mut edits = common_edits(&validity, tags, rm_tags);
            edits.extend(signing_keys.into_iter().map(ClaimEdit::AddSigningKey));
            edits.extend(rm_signing_keys.into_iter().map(ClaimEdit::RemoveSigningKey));
            (EntityRef::operator(operator), edits)
        }
        EditCommands::Account {
            name,
            operator,
            validity,
            tags,
            rm_tags,
            signing_keys,
            rm_signing_keys,
            conns,
            subscriptions,
            imports,
            exports,
            data,
            payload,
            wildcard_exports,
            rm_export,
            rm_import,
        } => {
            let operator = ctx.operator(&store, operator.as_deref())?;
            let account = ctx.account(&store, &operator, name.as_deref())?;
            let mut edits = common_edits(&validity, tags, rm_tags);
            edits.extend(signing_keys.into_iter().map(ClaimEdit::AddSigningKey));
            edits.extend(rm_signing_keys.into_iter().map(ClaimEdit::RemoveSigningKey));
            for (limit, value) in [
                (AccountLimit::Conns, conns),
                (AccountLimit::Subs, subscriptions),
                (AccountLimit::Imports, imports),
                (AccountLimit::Exports, exports),
                (AccountLimit::Data, data),
                (AccountLimit::Payload, payload),
            ] {
                if let Some(v) = value {
                    edits.push(ClaimEdit::AccountLimit(limit, v));
                }
            }
            if let Some(allowed) = wildcard_exports {
                edits.push(ClaimEdit::Wildcards(allowed));
            }
            edits.extend(rm_export.into_iter().map(ClaimEdit::RemoveExport));
            edits.extend(rm_import.into_iter().map(ClaimEdit::RemoveImport));
            (EntityRef::account(operator, account), edits)
        }
        EditCommands::User {
            name,
            account,
            operator,
            validity,
            tags,
            rm_tags,
            allow_pub,
            allow_sub,
            deny_pub,
            deny_sub,
            rm_pub,
            rm_sub,
            subs,
            data,
            payload,
        } => {
            let operator = ctx.operator(&store, operator.as_deref())?;
            let account = ctx.account(&store, &operator, account.as_deref())?;
            let name = name.ok_or_else(|| anyhow!("user name is required"))?;
            let user = store.resolve_user(&operator, &account, &name)?;
            let mut edits = common_edits(&validity, tags, rm_tags);
            for (dir, allow, deny, rm) in [
                (Direction::Publish, allow_pub, deny_pub, rm_pub),
                (Direction::Subscribe, allow_sub, deny_sub, rm_sub),
            ] {
                if !allow.is_empty() {
                    edits.push(ClaimEdit::Allow(dir, allow));
                }
                if !deny.is_empty() {
                    edits.push(ClaimEdit::Deny(dir, deny));
                }
                if !rm.is_empty() {
                    edits.push(ClaimEdit::RemovePermission(dir, rm));
                }
            }
            for (limit, value) in [
                (UserLimit::Subs, subs),
                (UserLimit::Data, data),
                (UserLimit::Payload, payload),
            ] {
                if let Some(v) = value {
                    edits.push(ClaimEdit::UserLimit(limit, v));
                }
            }
            (EntityRef::user(operator, account, user), edits)
        }
    };

    if edits.is_empty() {
        bail!("specify an edit option");
    }
    let signer = ctx.signer_for(&store, &entity)?;
    let claims = store.edit_claim(&entity, &edits, signer.as_ref(), ctx.clock)?;
    println!("Edited {} '{}'", entity.level(), entity.name());
    log::debug!("new claim id {}", claims.jti);
    Ok(())
}

fn common_edits(validity: &ValidityArgs, tags: Vec<String>, rm_tags: Vec<String>) -> Vec<ClaimEdit> {
    let mut edits = Vec::new();
    if let Some(start) = &validity.start {
        edits.push(ClaimEdit::Start(start.clone()));
    }
    if let Some(expiry) = &validity.expiry {
        edits.push(ClaimEdit::Expiry(expiry.clone()));
    }
    if !tags.is_empty() {
        edits.push(ClaimEdit::AddTags(tags));
    }
    if !rm_tags.is_empty() {
        edits.push(ClaimEdit::RemoveTags(rm_tags));
    }
    edits
}

/// `nsc describe operator|account|user`
fn cmd_describe(ctx: &Ctx<'_>, subcommand: DescribeCommands) -> Result<()> {
    let store = ctx.open_store()?;
    let (entity, output) = match subcommand {
        DescribeCommands::Operator { name, output } => {
            (EntityRef::operator(ctx.operator(&store, name.as_deref())?), output)
        }
        DescribeCommands::Account {
            name,
            operator,
            output,
        } => {
            let operator = ctx.operator(&store, operator.as_deref())?;
            let account = ctx.account(&store, &operator, name.as_deref())?;
            (EntityRef::account(operator, account), output)
        }
        DescribeCommands::User {
            name,
            account,
            operator,
            output,
        } => {
            let operator = ctx.operator(&store, operator.as_deref())?;
            let account = ctx.account(&store, &operator, account.as_deref())?;
            let name = name.ok_or_else(|| anyhow!("user name is required"))?;
            let user = store.resolve_user(&operator, &account, &name)?;
            (EntityRef::user(operator, account, user), output)
        }
    };

    if output.raw {
        let token = store.read_token(&entity)?;
        print!("{}", format_jwt(entity.level().as_str(), &token));
        return Ok(());
    }

    let claims = store.read_claim(&entity)?;
    if output.json {
        println!("{}", serde_json::to_string_pretty(&claims)?);
        return Ok(());
    }

    print_claims(&claims);
    match store.verify_chain(&entity) {
        Ok(_) => println!("  Chain:        valid"),
        Err(e) => println!("  Chain:        INVALID ({e})"),
    }
    Ok(())
}

fn print_claims(claims: &Claims) {
    let kind = claims.kind().as_str();
    let mut title = kind.to_string();
    title[..1].make_ascii_uppercase();
    println!("{title}: {}", claims.name);
    println!("  Key:          {}", claims.sub);
    println!("  Issuer:       {}", claims.iss);
    println!("  Issued:       {}", describe_time(Some(claims.iat), ""));
    println!("  Not before:   {}", describe_time(claims.nbf, "immediate"));
    println!("  Expires:      {}", describe_time(claims.exp, "never"));
    if !claims.tags().is_empty() {
        println!("  Tags:         {}", claims.tags().join(", "));
    }
    for key in claims.signing_keys() {
        println!("  Signing key:  {key}");
    }

    if let Some(account) = claims.as_account() {
        let l = &account.limits;
        println!(
            "  Limits:       conns={} subs={} imports={} exports={} data={} payload={} wildcards={}",
            limit(l.conn),
            limit(l.subs),
            limit(l.imports),
            limit(l.exports),
            limit(l.data),
            limit(l.payload),
            l.wildcards
        );
        for e in &account.exports {
            println!(
                "  Export:       {} {} ({})",
                e.kind,
                e.subject,
                if e.token_req { "private" } else { "public" }
            );
        }
        for i in &account.imports {
            println!(
                "  Import:       {} {} from {}{}",
                i.kind,
                i.subject,
                i.account,
                if i.token.is_some() { " (token)" } else { "" }
            );
        }
    }

    if let Some(user) = claims.as_user() {
        let show = |label: &str, list: &[String]| {
            if !list.is_empty() {
                println!("  {label:<13} {}", list.join(", "));
            }
        };
        show("Pub allow:", &user.publish.allow);
        show("Pub deny:", &user.publish.deny);
        show("Sub allow:", &user.subscribe.allow);
        show("Sub deny:", &user.subscribe.deny);
        println!(
            "  Limits:       subs={} data={} payload={}",
            limit(user.limits.subs),
            limit(user.limits.data),
            limit(user.limits.payload)
        );
    }
}

fn limit(v: i64) -> String {
    if v < 0 {
        "unlimited".to_string()
    } else {
        v.to_string()
    }
}

/// `nsc generate activation --target-account KEY [--subject SUBJECT]`
fn cmd_generate_activation(
    ctx: &Ctx<'_>,
    answers: &mut dyn AnswerSource,
    mut req: ActivationRequest,
) -> Result<()> {
    let store = ctx.open_store()?;
    let operator = ctx.operator(&store, None)?;

    if ctx.interactive {
        ask_activation(&store, &operator, answers, &mut req)?;
    }
    req.signer = resolve_signer(ctx.private_key.as_deref(), KeyRole::Account)?;

    let activation = generate_activation(&store, &operator, &req, ctx.clock)?;
    match &req.output {
        Some(path) => println!("Wrote activation to {}", path.display()),
        None => print!("{}", activation.armored()),
    }
    Ok(())
}

/// Ask for whatever the activation request leaves open.
fn ask_activation(
    store: &TrustStore,
    operator: &str,
    answers: &mut dyn AnswerSource,
    req: &mut ActivationRequest,
) -> Result<()> {
    if req.account.is_none() {
        let accounts = store.list_accounts(operator)?;
        if accounts.len() > 1 {
            let i = answers.select("select account", &accounts)?;
            req.account = Some(accounts[i].clone());
        }
    }
    if req.subject.is_none() {
        let account = match &req.account {
            Some(a) => store.resolve_account(operator, a)?,
            None => store.current_account(operator)?,
        };
        let claims = store.read_claim(&EntityRef::account(operator, &account))?;
        let private: Vec<String> = claims
            .as_account()
            .map(|a| {
                a.exports
                    .iter()
                    .filter(|e| e.token_req)
                    .map(|e| e.subject.clone())
                    .collect()
            })
            .unwrap_or_default();
        if !private.is_empty() {
            let i = answers.select("select export", &private)?;
            req.subject = Some(private[i].clone());
        }
    }
    if req.target_account.is_empty() {
        req.target_account = answers.text("target account nkey or path to one", "")?;
    }
    req.start = answers.text("valid from ('0' is always, '2h' is 2 hours)", "0")?;
    req.expiry = answers.text("valid until ('0' is always, '2M' is 2 months)", "0")?;
    Ok(())
}

/// `nsc generate creds --name USER [--account ACCOUNT] [--operator OPERATOR]`
fn cmd_generate_creds(
    ctx: &Ctx<'_>,
    name: &str,
    operator: Option<&str>,
    account: Option<&str>,
    output: Option<&Path>,
) -> Result<()> {
    let store = ctx.open_store()?;
    let operator = ctx.operator(&store, operator)?;
    let account = ctx.account(&store, &operator, account)?;
    let user = store.resolve_user(&operator, &account, name)?;
    let creds = store.export_user_creds(&operator, &account, &user)?;
    match output {
        Some(path) => {
            write_atomic(path, creds.as_bytes())
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!("Wrote credentials for user '{user}' to {}", path.display());
        }
        None => print!("{creds}"),
    }
    Ok(())
}

/// `nsc env [--operator NAME] [--account NAME]`
fn cmd_env(ctx: &Ctx<'_>, operator: Option<&str>, account: Option<&str>) -> Result<()> {
    let store = ctx.open_store()?;
    if let Some(reference) = operator {
        let name = store.resolve_operator(reference)?;
        store.set_current(Level::Operator, &name)?;
    }
    if let Some(reference) = account {
        let op = ctx.operator(&store, None)?;
        if store.current()?.operator.as_deref() != Some(op.as_str()) {
            store.set_current(Level::Operator, &op)?;
        }
        let name = store.resolve_account(&op, reference)?;
        store.set_current(Level::Account, &name)?;
    }

    let sel = store.current()?;
    let show = |p: Option<&PathBuf>| p.map(|p| p.display().to_string()).unwrap_or_default();
    println!("{:<18} {}", "Stores Dir", show(ctx.config.store_root.as_ref()));
    println!("{:<18} {}", "Keys Dir", show(ctx.config.keys_dir.as_ref()));
    println!(
        "{:<18} {}",
        "Current Operator",
        sel.operator.as_deref().unwrap_or("")
    );
    println!(
        "{:<18} {}",
        "Current Account",
        sel.account.as_deref().unwrap_or("")
    );
    if let Some(op) = &ctx.config.operator {
        println!("{:<18} {op}", "Operator Override");
    }
    Ok(())
}

/// `nsc list keys|operators|accounts|users`
fn cmd_list(ctx: &Ctx<'_>, subcommand: ListCommands) -> Result<()> {
    match subcommand {
        ListCommands::Keys => {
            let mut keys = ctx.config.key_store()?.list()?;
            keys.sort_by(|a, b| a.public_key.cmp(&b.public_key));
            if keys.is_empty() {
                println!("No keys found");
                return Ok(());
            }
            println!("{:<8} {:<58} SEED", "ROLE", "PUBLIC KEY");
            println!("{}", "-".repeat(72));
            for k in &keys {
                let role = KeyPair::from_public_key(&k.public_key)
                    .map(|kp| kp.role().to_string())
                    .unwrap_or_default();
                println!(
                    "{:<8} {:<58} {}",
                    role,
                    k.public_key,
                    if k.has_seed { "*" } else { "" }
                );
            }
        }
        ListCommands::Operators => {
            let store = ctx.open_store()?;
            for name in store.list_operators()? {
                println!("{name}");
            }
        }
        ListCommands::Accounts => {
            let store = ctx.open_store()?;
            let operator = ctx.operator(&store, None)?;
            for name in store.list_accounts(&operator)? {
                println!("{name}");
            }
        }
        ListCommands::Users { account } => {
            let store = ctx.open_store()?;
            let operator = ctx.operator(&store, None)?;
            let account = ctx.account(&store, &operator, account.as_deref())?;
            for name in store.list_users(&operator, &account)? {
                println!("{name}");
            }
        }
    }
    Ok(())
}
