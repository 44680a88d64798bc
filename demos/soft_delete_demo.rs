//! # Soft Delete Example
//!
//! Walks one record type through its lifecycle: saved, trashed, found again
//! through the trashed scopes, restored, and finally purged.
//!
//! The in-memory backend keeps this runnable without a database. Set
//! `RUST_LOG=debug` to see the lifecycle events.

use softhaus::prelude::*;
use std::sync::Arc;

/// A document that goes to the trash before it is gone for good
#[model]
#[table(name = "documents")]
pub struct Document {
    #[primary_key]
    pub id: Uuid,

    pub title: String,

    /// `None` while the document is active
    #[soft_delete]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Document {
    fn new(title: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            deleted_at: None,
        }
    }
}

fn print_titles(label: &str, documents: &[Document]) {
    let titles: Vec<&str> = documents.iter().map(|d| d.title.as_str()).collect();
    println!("   {label}: {titles:?}");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    println!("🗑️  SoftHaus Soft Delete Example");
    println!("================================");

    // An entity without its own column uses the configured default
    let config = SoftDeleteConfig::default();
    let mapping = EntityMapping::resolve::<Document>(&config)?;
    println!(
        "\n📋 Marker column for {}: {}",
        mapping.table(),
        mapping.marker_column().unwrap_or("-")
    );

    let backend = Arc::new(MemoryBackend::new(mapping));
    let documents = RepositoryFactory::create::<Document, _>(Arc::clone(&backend));
    let session = Session::new();

    println!("\n📝 Step 1: Saving documents");
    let mut draft = documents.save(&session, Document::new("draft")).await?;
    documents
        .save_all(
            &session,
            vec![Document::new("report"), Document::new("notes")],
        )
        .await?;
    print_titles("visible", &documents.find_all(&session).await?);

    println!("\n🗑️  Step 2: Moving the draft to the trash");
    documents.delete(&session, &mut draft).await?;
    print_titles("visible", &documents.find_all(&session).await?);
    print_titles("trashed", &documents.find_all_trashed(&session).await?);
    println!(
        "   counts: {} visible, {} in total",
        documents.count(&session).await?,
        documents.count_with_trashed(&session).await?
    );

    println!("\n♻️  Step 3: Restoring the draft");
    documents.restore(&session, &mut draft).await?;
    print_titles("visible", &documents.find_all(&session).await?);

    println!("\n🔥 Step 4: Purging the draft");
    documents.soft_delete(&session, &mut draft).await?;
    documents.force_delete(&session, &draft).await?;
    print_titles("everything", &documents.find_all_with_trashed(&session).await?);
    println!("   rows left in storage: {}", backend.stored_rows()?.len());

    println!("\n✅ Soft delete example completed");
    Ok(())
}
