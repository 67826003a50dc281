//! CEJAM console CLI
//!
//! Command-line access to the school administration API: authentication,
//! listing, form-driven create/update, deletes and per-record actions.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use cejamsys_console::catalog::{self, SECTIONS};
use cejamsys_console::{
    data_dir, json_type_name, load_catalog_auto, payload_schema, ApiClient, ApiError, ApiRequest,
    ClientConfig, EntityId, FieldError, FieldKind, FileTokenStore, FormState, OptionCache,
    OptionResolver, OptionSource, Registry, ResourceConfig, ResourceField, ResourceStore,
    SchemaError, StoreError, TableView, DEFAULT_API_PREFIX, DEFAULT_API_URL, ENV_ACCESS_TOKEN,
    ENV_API_PREFIX, ENV_API_URL, ENV_DATA_DIR,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cejamsys")]
#[command(about = "Administration console for the CEJAM school management API")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Backend origin
    #[arg(long, global = true, env = ENV_API_URL, default_value = DEFAULT_API_URL)]
    api_url: String,

    /// API path prefix
    #[arg(long, global = true, env = ENV_API_PREFIX, default_value = DEFAULT_API_PREFIX)]
    api_prefix: String,

    /// Access token that overrides the stored login
    #[arg(long, global = true, env = ENV_ACCESS_TOKEN, hide_env_values = true)]
    token: Option<String>,

    /// Directory for the persisted login
    #[arg(long, global = true, env = ENV_DATA_DIR)]
    data_dir: Option<PathBuf>,

    /// Resource catalog: file path or URL (built-in catalog if omitted)
    #[arg(long, global = true)]
    catalog: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Obtain and store an access/refresh token pair
    Login {
        #[arg(long, short, env = "CEJAMSYS_USERNAME")]
        username: String,

        #[arg(long, short, env = "CEJAMSYS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Forget the stored tokens
    Logout,

    /// Show the logged-in user
    Me {
        #[arg(long)]
        json: bool,
    },

    /// Show dashboard figures and recent activity
    Dashboard {
        #[arg(long)]
        json: bool,
    },

    /// List the resources of the catalog
    Resources {
        #[arg(long)]
        json: bool,
    },

    /// List records of a resource
    List {
        resource: String,

        #[arg(long, default_value_t = 1)]
        page: u64,

        #[arg(long, short)]
        search: Option<String>,

        /// Exact-match filter as FIELD=VALUE (repeatable)
        #[arg(long = "filter", value_name = "FIELD=VALUE")]
        filters: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Describe the form fields of a resource
    ShowForm {
        resource: String,

        /// Print the JSON Schema of the submitted payload instead
        #[arg(long)]
        schema: bool,
    },

    /// Create a record
    Create {
        resource: String,

        #[command(flatten)]
        input: FormInput,
    },

    /// Update a record
    Update {
        resource: String,
        id: String,

        #[command(flatten)]
        input: FormInput,
    },

    /// Delete a record
    Delete { resource: String, id: String },

    /// Show the options of a select field
    Options { resource: String, field: String },

    /// Run a custom action on a record
    Action {
        resource: String,
        id: String,
        action: String,
    },
}

#[derive(Args)]
struct FormInput {
    /// Field value as FIELD=VALUE (repeatable)
    #[arg(long = "set", value_name = "FIELD=VALUE")]
    sets: Vec<String>,

    /// Field values as a JSON object, applied before --set
    #[arg(long)]
    data: Option<String>,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Login { username, password } => run_login(&cli.global, &username, &password),
        Commands::Logout => run_logout(&cli.global),
        Commands::Me { json } => run_me(&cli.global, json),
        Commands::Dashboard { json } => run_dashboard(&cli.global, json),
        Commands::Resources { json } => run_resources(&cli.global, json),
        Commands::List {
            resource,
            page,
            search,
            filters,
            json,
        } => run_list(&cli.global, &resource, page, search.as_deref(), &filters, json),
        Commands::ShowForm { resource, schema } => run_show_form(&cli.global, &resource, schema),
        Commands::Create { resource, input } => run_create(&cli.global, &resource, &input),
        Commands::Update {
            resource,
            id,
            input,
        } => run_update(&cli.global, &resource, &id, &input),
        Commands::Delete { resource, id } => run_delete(&cli.global, &resource, &id),
        Commands::Options { resource, field } => run_options(&cli.global, &resource, &field),
        Commands::Action {
            resource,
            id,
            action,
        } => run_action(&cli.global, &resource, &id, &action),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let log_json = std::env::var("CEJAMSYS_LOG_JSON")
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn api_error(e: ApiError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn schema_error(e: SchemaError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn store_error(e: StoreError) -> u8 {
    eprintln!("Error: {}", e);
    e.exit_code() as u8
}

fn field_errors(errors: Vec<FieldError>) -> u8 {
    for error in &errors {
        eprintln!("Error: {}", error);
    }
    2
}

fn client(global: &GlobalArgs) -> Result<ApiClient, u8> {
    let mut config = ClientConfig::new(&global.api_url)
        .prefix(&global.api_prefix)
        .static_token(global.token.clone());
    if let Some(seconds) = global.timeout {
        config = config.timeout(Duration::from_secs(seconds));
    }
    let dir = global.data_dir.clone().unwrap_or_else(data_dir);
    let tokens = Arc::new(FileTokenStore::new(&dir));
    ApiClient::new(config, tokens).map_err(api_error)
}

fn registry(global: &GlobalArgs) -> Result<Registry, u8> {
    match &global.catalog {
        Some(source) => load_catalog_auto(source),
        None => catalog::builtin(),
    }
    .map_err(schema_error)
}

fn resource(registry: &Registry, key: &str) -> Result<ResourceConfig, u8> {
    registry.require(key).cloned().map_err(schema_error)
}

fn print_json(value: &impl serde::Serialize) -> Result<(), u8> {
    let output = serde_json::to_string_pretty(value).map_err(|e| {
        eprintln!("Error: {}", e);
        1u8
    })?;
    println!("{}", output);
    Ok(())
}

fn run_login(global: &GlobalArgs, username: &str, password: &str) -> Result<(), u8> {
    let client = client(global)?;
    client.login(username, password).map_err(api_error)?;
    println!("Logged in as {}", username);
    Ok(())
}

fn run_logout(global: &GlobalArgs) -> Result<(), u8> {
    client(global)?.logout().map_err(api_error)?;
    println!("Logged out");
    Ok(())
}

fn run_me(global: &GlobalArgs, json: bool) -> Result<(), u8> {
    let user = client(global)?.me().map_err(api_error)?;
    if json {
        return print_json(&user);
    }
    println!("{} ({})", user.display_name(), user.username);
    if !user.email.is_empty() {
        println!("Email: {}", user.email);
    }
    if user.is_superuser {
        println!("Superusuario");
    }
    if !user.groups.is_empty() {
        println!("Grupos: {}", user.groups.join(", "));
    }
    Ok(())
}

fn run_dashboard(global: &GlobalArgs, json: bool) -> Result<(), u8> {
    let dashboard = client(global)?.dashboard().map_err(api_error)?;
    if json {
        return print_json(&dashboard);
    }
    for card in dashboard.stat_cards() {
        println!("{}: {}", card.label, card.value);
    }
    let activity = dashboard.activity_lines();
    if !activity.is_empty() {
        println!();
        println!("Atividade recente");
        for line in activity {
            println!("  {}", line);
        }
    }
    Ok(())
}

fn run_resources(global: &GlobalArgs, json: bool) -> Result<(), u8> {
    let registry = registry(global)?;
    if json {
        let configs: Vec<&ResourceConfig> = registry.iter().collect();
        return print_json(&configs);
    }

    let mut listed = Vec::new();
    for section in SECTIONS {
        let members: Vec<&ResourceConfig> = section
            .items
            .iter()
            .filter_map(|key| registry.get(key))
            .collect();
        if members.is_empty() {
            continue;
        }
        println!("{}", section.title);
        for config in members {
            print_resource_line(config);
            listed.push(config.key.as_str());
        }
    }

    let others: Vec<&ResourceConfig> = registry
        .iter()
        .filter(|c| !listed.contains(&c.key.as_str()))
        .collect();
    if !others.is_empty() {
        println!("Outros");
        for config in others {
            print_resource_line(config);
        }
    }
    Ok(())
}

fn print_resource_line(config: &ResourceConfig) {
    println!("  {:<24} {:<28} {}", config.key, config.title, config.collection_path());
}

fn split_pair(pair: &str) -> Result<(&str, &str), u8> {
    match pair.split_once('=') {
        Some((name, value)) => Ok((name.trim(), value)),
        None => {
            eprintln!("Error: expected FIELD=VALUE, got \"{}\"", pair);
            Err(2)
        }
    }
}

fn run_list(
    global: &GlobalArgs,
    key: &str,
    page: u64,
    search: Option<&str>,
    filters: &[String],
    json: bool,
) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    let filters = filters
        .iter()
        .map(|pair| split_pair(pair))
        .collect::<Result<Vec<_>, u8>>()?;
    let store = ResourceStore::new(client(global)?, config.clone());

    if !filters.is_empty() {
        store.set_filters(filters.iter().copied()).map_err(store_error)?;
    }
    if let Some(term) = search {
        store.set_search(term).map_err(store_error)?;
    }
    if filters.is_empty() && search.is_none() {
        store.refresh().map_err(store_error)?;
    }
    if page > 1 {
        store.set_page(page).map_err(store_error)?;
    }

    let state = store.snapshot();
    if json {
        return print_json(&serde_json::json!({
            "count": state.count,
            "page": state.page,
            "total_pages": state.total_pages,
            "results": state.visible_items().collect::<Vec<_>>(),
        }));
    }
    print!("{}", TableView::new(&config, &state).render_text());
    Ok(())
}

fn run_show_form(global: &GlobalArgs, key: &str, schema: bool) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    if schema {
        return print_json(&payload_schema(&config.fields));
    }

    let title = if config.singular.is_empty() {
        &config.title
    } else {
        &config.singular
    };
    println!("{} ({})", title, config.collection_path());
    let form = FormState::for_config(&config, None);
    for group in form.sections() {
        println!("  [{}]", group.title);
        for field in group.fields {
            println!("    {}", describe_field(field));
        }
    }
    if !config.filters.is_empty() {
        println!("  Filtros: {}", config.filters.join(", "));
    }
    Ok(())
}

fn describe_field(field: &ResourceField) -> String {
    let mut kind = field.kind.type_name().to_string();
    if field.kind.is_multi_select() {
        kind.push_str("[]");
    }
    let mut line = format!("{:<28} {:<10} {}", field.name, kind, field.label);
    if field.required {
        line.push_str(" *");
    }
    if field.read_only {
        line.push_str(" (somente leitura)");
    }
    if let FieldKind::Select(spec) = &field.kind {
        match &spec.source {
            OptionSource::Static(options) => {
                let values: Vec<String> = options.iter().map(|o| o.value.to_string()).collect();
                line.push_str(&format!(" [{}]", values.join("|")));
            }
            OptionSource::Resource(reference) => {
                line.push_str(&format!(" <- {}", reference.endpoint));
            }
        }
    }
    line
}

fn apply_input(form: &mut FormState, input: &FormInput) -> Result<(), u8> {
    if let Some(data) = &input.data {
        let value: Value = serde_json::from_str(data).map_err(|e| {
            eprintln!("Error: invalid --data JSON: {}", e);
            2u8
        })?;
        let values = match value {
            Value::Object(values) => values,
            other => {
                eprintln!(
                    "Error: --data must be a JSON object, got {}",
                    json_type_name(&other)
                );
                return Err(2);
            }
        };
        for (name, value) in values {
            form.set(&name, value).map_err(schema_error)?;
        }
    }
    for pair in &input.sets {
        let (name, text) = split_pair(pair)?;
        form.set_text(name, text).map_err(schema_error)?;
    }
    Ok(())
}

fn run_create(global: &GlobalArgs, key: &str, input: &FormInput) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    let mut form = FormState::for_config(&config, None);
    apply_input(&mut form, input)?;
    let payload = form.submit().map_err(field_errors)?;

    let store = ResourceStore::new(client(global)?, config);
    let created = store.create_item(&payload).map_err(store_error)?;
    print_json(&created)
}

fn run_update(global: &GlobalArgs, key: &str, id: &str, input: &FormInput) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    let client = client(global)?;
    let id = EntityId::from(id);

    let current = client
        .send(&ApiRequest::get(config.item_path(&id)))
        .map_err(api_error)?;
    let Some(Value::Object(item)) = current else {
        eprintln!("Error: record {} not found", id);
        return Err(1);
    };

    let mut form = FormState::for_config(&config, Some(&item));
    if form.is_locked() {
        return Err(store_error(StoreError::Locked { id: id.to_string() }));
    }
    apply_input(&mut form, input)?;
    let payload = form.submit().map_err(field_errors)?;

    let store = ResourceStore::new(client, config);
    let updated = store.update_item(&id, &payload).map_err(store_error)?;
    print_json(&updated)
}

fn run_delete(global: &GlobalArgs, key: &str, id: &str) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    let id = EntityId::from(id);
    let store = ResourceStore::new(client(global)?, config);
    store.delete_item(&id).map_err(store_error)?;
    println!("Deleted {} {}", key, id);
    Ok(())
}

fn run_options(global: &GlobalArgs, key: &str, field_name: &str) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    let field = config
        .field(field_name)
        .ok_or_else(|| {
            schema_error(SchemaError::UnknownField {
                resource: key.to_string(),
                field: field_name.to_string(),
            })
        })?
        .clone();

    let resolver = OptionResolver::new(client(global)?, OptionCache::new());
    let state = resolver.resolve_field(&field);
    if let Some(message) = state.error {
        eprintln!("Error: {}", message);
        return Err(1);
    }
    for option in state.options {
        println!("{}\t{}", option.value, option.label);
    }
    Ok(())
}

fn run_action(global: &GlobalArgs, key: &str, id: &str, action: &str) -> Result<(), u8> {
    let registry = registry(global)?;
    let config = resource(&registry, key)?;
    let id = EntityId::from(id);
    let store = ResourceStore::new(client(global)?, config);
    match store.run_action(&id, action).map_err(store_error)? {
        Some(result) => print_json(&result),
        None => {
            println!("OK");
            Ok(())
        }
    }
}
