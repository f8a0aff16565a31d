//! Formwork Demo - drives a sign-up form through a scripted session.
//!
//! The schema is parsed from JSON, its remote collaborators are attached in
//! code, and a short sequence of user input is replayed against it. Drafts
//! land in `FORMWORK_DRAFT_DIR`.

use std::sync::Arc;
use std::time::Duration;

use formwork_engine::{
    AsyncValidator, FieldValue, FormSchema, OptionsLoader, RemoteError, SelectOption,
};
use formwork_runtime::{FormEngine, RuntimeConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SIGNUP_SCHEMA: &str = r#"{
    "version": 1,
    "fields": [
        {
            "type": "text",
            "name": "username",
            "label": "Username",
            "validation": { "required": true, "minLength": 3, "pattern": "^[a-z0-9_]+$" },
            "asyncValidation": { "debounceMs": 200 }
        },
        { "type": "number", "name": "age", "label": "Age", "validation": { "min": 18 } },
        { "type": "checkbox", "name": "newsletter", "label": "Subscribe to newsletter" },
        {
            "type": "select",
            "name": "country",
            "label": "Country",
            "options": [
                { "label": "India", "value": "in" },
                { "label": "USA", "value": "us" }
            ],
            "asyncOptions": { "key": "countries" }
        },
        {
            "type": "group",
            "name": "company",
            "label": "Company",
            "fields": [
                {
                    "type": "checkbox",
                    "name": "hasCompany",
                    "label": "I own a company",
                    "defaultValue": false
                },
                {
                    "type": "text",
                    "name": "companyName",
                    "label": "Company Name",
                    "validation": { "required": true },
                    "visibleWhen": { "field": "hasCompany", "equals": true }
                }
            ]
        }
    ]
}"#;

const TAKEN_USERNAMES: &[&str] = &["admin", "root", "support"];

fn signup_schema() -> Result<FormSchema, formwork_engine::Error> {
    let mut schema = FormSchema::from_json(SIGNUP_SCHEMA)?;

    let loader: Arc<dyn OptionsLoader> = Arc::new(|| async {
        tokio::time::sleep(Duration::from_millis(150)).await;
        Ok::<_, RemoteError>(vec![
            SelectOption::new("Germany", "de"),
            SelectOption::new("India", "in"),
            SelectOption::new("Japan", "jp"),
            SelectOption::new("USA", "us"),
        ])
    });
    if let Some(source) = schema
        .find_field_mut("country")
        .and_then(|field| field.async_options.as_mut())
    {
        source.loader = Some(loader);
    }

    let validator: Arc<dyn AsyncValidator> = Arc::new(|value: FieldValue| async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        let taken = value
            .as_str()
            .map(|name| TAKEN_USERNAMES.contains(&name))
            .unwrap_or(false);
        Ok::<_, RemoteError>(taken.then(|| "Username is already taken".to_string()))
    });
    if let Some(validation) = schema
        .find_field_mut("username")
        .and_then(|field| field.async_validation.as_mut())
    {
        validation.validator = Some(validator);
    }

    Ok(schema)
}

fn print_snapshot(label: &str, engine: &FormEngine) -> Result<(), serde_json::Error> {
    println!("--- {} ---", label);
    println!("values: {}", serde_json::to_string(engine.values())?);
    println!("errors: {}", serde_json::to_string(engine.errors())?);
    println!("async errors: {}", serde_json::to_string(&engine.async_errors())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "formwork_runtime=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = RuntimeConfig::from_env()?;

    tracing::info!(draft_dir = %config.draft_dir.display(), "Starting Formwork demo");

    let mut engine = FormEngine::from_config(signup_schema()?, &config)?;
    let settle = Duration::from_millis(config.debounce_ms.max(200) + 300);

    if let Some(mut options) = engine.subscribe_options("country") {
        options.wait_for(|state| !state.loading).await?;
    }
    if let Some(options) = engine.options("country") {
        println!("country options: {}", serde_json::to_string(&options)?);
    }

    // A first, too-short attempt that is quickly corrected
    engine.set_value("username", "ad".into());
    engine.set_touched("username");
    engine.set_value("username", "admin".into());
    tokio::time::sleep(settle).await;
    engine.validate();
    print_snapshot("taken username", &engine)?;

    engine.set_value("hasCompany", true.into());
    engine.set_touched("hasCompany");
    engine.validate();
    print_snapshot("company section shown", &engine)?;

    engine.set_value("username", "alice".into());
    engine.set_value("age", 30.into());
    engine.set_value("country", "jp".into());
    engine.set_value("companyName", "Acme".into());
    tokio::time::sleep(settle).await;

    if engine.validate() && engine.async_errors().is_empty() {
        println!(
            "Submitted values: {}",
            serde_json::to_string_pretty(engine.values())?
        );
        engine.reset();
    } else {
        print_snapshot("submission blocked", &engine)?;
    }

    Ok(())
}
