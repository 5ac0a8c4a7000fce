//! # Operation Dispatch
//!
//! Request routing for the process boundary: one call = one named operation
//! with a fixed positional argument list, always resolving to an
//! [`Envelope`]; never a panic or an error crossing the boundary.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Bridge Dispatch                                  │
//! │                                                                         │
//! │  ("update-customer", [4, { "phone": "98..." }])                        │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  handle present? ── no ──► { success: false, error: "...not           │
//! │        │ yes                 initialized" }                             │
//! │        ▼                                                                │
//! │  route by name ── unknown ──► failure envelope naming the op           │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  parse positional args ── bad shape ──► failure envelope               │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  repository call ── DbError ──► failure envelope with the message      │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  success envelope                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::envelope::Envelope;
use khata_core::{InvoiceKey, NewProduct};
use khata_db::seed::{self, BootstrapFlags};
use khata_db::{Database, DbConfig, DbError, DbResult, JsonMap};

/// A boundary request in serialized form: operation name plus positional
/// arguments, as the UI process sends them over IPC.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub op: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

/// The process-boundary adapter.
///
/// Owns the (single) database handle. Operations dispatched before `init`
/// or after `shutdown` are answered with a failure envelope rather than a
/// panic; `init` itself is fatal on failure and the caller is expected to
/// abort startup.
pub struct Bridge {
    db: RwLock<Option<Database>>,
}

impl Bridge {
    /// Creates a bridge with no database handle yet.
    pub fn new() -> Self {
        Bridge {
            db: RwLock::new(None),
        }
    }

    /// Opens the database and provisions the schema.
    ///
    /// Errors here are fatal: a process that cannot open or provision its
    /// database must not continue serving requests.
    pub async fn init(&self, config: DbConfig) -> DbResult<()> {
        let db = Database::new(config).await?;
        *self.db.write().await = Some(db);
        info!("Bridge initialized");
        Ok(())
    }

    /// Opens the database and seeds demo data if the first-run flag is set.
    pub async fn init_with_first_run(
        &self,
        config: DbConfig,
        flags: &mut dyn BootstrapFlags,
    ) -> DbResult<()> {
        self.init(config).await?;

        let guard = self.db.read().await;
        if let Some(db) = guard.as_ref() {
            seed::seed_if_first_run(db, flags).await?;
        }
        Ok(())
    }

    /// Closes the database handle. Later dispatches answer with the
    /// absent-handle failure envelope.
    pub async fn shutdown(&self) {
        if let Some(db) = self.db.write().await.take() {
            db.close().await;
            info!("Bridge shut down");
        }
    }

    /// Dispatches a deserialized request.
    pub async fn dispatch_request(&self, request: &Request) -> Envelope {
        self.dispatch(&request.op, &request.args).await
    }

    /// Dispatches one operation by name with positional arguments.
    pub async fn dispatch(&self, op: &str, args: &[Value]) -> Envelope {
        debug!(op, args = args.len(), "Dispatching");

        let guard = self.db.read().await;
        let Some(db) = guard.as_ref() else {
            return Envelope::fail("database not initialized");
        };

        match execute(db, op, args).await {
            Ok(envelope) => envelope,
            Err(envelope) => {
                warn!(op, "Operation failed");
                envelope
            }
        }
    }
}

impl Default for Bridge {
    fn default() -> Self {
        Bridge::new()
    }
}

// =============================================================================
// Routing
// =============================================================================

/// Routes one operation. Early exits carry the failure envelope through the
/// error arm of the Result; both arms are envelopes in the end.
async fn execute(db: &Database, op: &str, args: &[Value]) -> Result<Envelope, Envelope> {
    match op {
        // --- customers -------------------------------------------------------
        "filter-customers" => {
            let filters = arg_object_or_empty(args, 0)?;
            let customers = db.customers().find_by_filters(&filters).await.map_err(db_fail)?;
            Ok(Envelope::data(&customers))
        }
        "get-all-customers" => {
            let customers = db.customers().list_all().await.map_err(db_fail)?;
            Ok(Envelope::data(&customers))
        }
        "create-customer" => {
            let data = arg_object(args, 0, "customer")?;
            let customer = db.customers().create(data).await.map_err(db_fail)?;
            Ok(Envelope::data(&customer))
        }
        "update-customer" => {
            let id = arg_i64(args, 0, "id")?;
            let updates = arg_object(args, 1, "updates")?;
            let (changes, rows) = db.customers().update(id, updates).await.map_err(db_fail)?;
            Ok(Envelope::data_with_changes(&rows, changes))
        }
        "delete-customer" => {
            let id = arg_i64(args, 0, "id")?;
            let deleted = db.customers().delete(id).await.map_err(db_fail)?;
            let rows: Vec<_> = deleted.into_iter().collect();
            Ok(Envelope::deleted_rows(&rows))
        }

        // --- invoices --------------------------------------------------------
        "create-invoice" => {
            let fields = arg_object(args, 0, "invoice")?;
            let items = arg_items(args, 1)?;
            let created = db.invoices().create(fields, &items).await.map_err(db_fail)?;
            Ok(Envelope::keyed("createdInvoice", &created))
        }
        "get-invoice" => {
            let key = arg_invoice_key(args, 0)?;
            let invoice = db.invoices().get(&key).await.map_err(db_fail)?;
            Ok(Envelope::keyed("invoice", &invoice))
        }
        "update-invoice" => {
            let key = arg_invoice_key(args, 0)?;
            let fields = arg_object_or_empty(args, 1)?;
            let items = arg_items(args, 2)?;
            let updated = db
                .invoices()
                .update(&key, &fields, &items)
                .await
                .map_err(db_fail)?;
            Ok(Envelope::keyed("updatedInvoice", &updated))
        }
        "delete-invoice" => {
            let key = arg_invoice_key(args, 0)?;
            let changes = db.invoices().delete(&key).await.map_err(db_fail)?;
            Ok(Envelope::removed(changes))
        }

        // --- products --------------------------------------------------------
        "filter-products" => {
            let filters = arg_object_or_empty(args, 0)?;
            let products = db.products().find_by_filters(&filters).await.map_err(db_fail)?;
            Ok(Envelope::data(&products))
        }
        "get-all-products" => {
            let products = db.products().list_all().await.map_err(db_fail)?;
            Ok(Envelope::data(&products))
        }
        "create-product" => {
            let value = arg(args, 0, "product")?;
            let product: NewProduct = serde_json::from_value(value.clone())
                .map_err(|e| Envelope::fail(format!("invalid product: {e}")))?;
            let created = db.products().create(&product).await.map_err(db_fail)?;
            Ok(Envelope::data(&created))
        }
        "update-product-stock" => {
            let sku = arg_str(args, 0, "sku")?;
            let stock = arg_i64(args, 1, "stock")?;
            db.products().update_stock(sku, stock).await.map_err(db_fail)?;
            Ok(Envelope::removed(1))
        }

        // --- transactions ----------------------------------------------------
        "create-transaction" => {
            let data = arg_object(args, 0, "transaction")?;
            let created = db.transactions().create(data).await.map_err(db_fail)?;
            Ok(Envelope::data(&created))
        }
        "update-transaction" => {
            let id = arg_i64(args, 0, "id")?;
            let updates = arg_object(args, 1, "updates")?;
            let (changes, updated) = db.transactions().update(id, updates).await.map_err(db_fail)?;
            Ok(Envelope::data_with_changes(&updated, changes))
        }
        "delete-transaction" => {
            let id = arg_i64(args, 0, "id")?;
            let changes = db.transactions().delete(id).await.map_err(db_fail)?;
            Ok(Envelope::removed(changes))
        }
        "get-invoice-transactions" => {
            let invoice_pk = arg_i64(args, 0, "invoice id")?;
            let transactions = db
                .transactions()
                .list_for_invoice(invoice_pk)
                .await
                .map_err(db_fail)?;
            Ok(Envelope::data(&transactions))
        }

        // --- payment methods -------------------------------------------------
        "get-payment-methods" => {
            let methods = db.payment_methods().list_all().await.map_err(db_fail)?;
            Ok(Envelope::data(&methods))
        }
        "create-payment-method" => {
            let name = arg_str(args, 0, "name")?;
            let ac_no = arg_str(args, 1, "ac_no")?;
            let created = db.payment_methods().create(name, ac_no).await.map_err(db_fail)?;
            Ok(Envelope::data(&created))
        }

        _ => Ok(Envelope::fail(format!("unknown operation: {op}"))),
    }
}

fn db_fail(err: DbError) -> Envelope {
    Envelope::fail(err.to_string())
}

// =============================================================================
// Positional Argument Parsing
// =============================================================================

fn arg<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a Value, Envelope> {
    args.get(idx)
        .ok_or_else(|| Envelope::fail(format!("{name} argument is required")))
}

fn arg_object<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a JsonMap, Envelope> {
    arg(args, idx, name)?
        .as_object()
        .ok_or_else(|| Envelope::fail(format!("{name} must be an object")))
}

/// A missing or null filter argument degrades to an empty map; the
/// permissive contract.
fn arg_object_or_empty(args: &[Value], idx: usize) -> Result<JsonMap, Envelope> {
    match args.get(idx) {
        None | Some(Value::Null) => Ok(JsonMap::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(_) => Err(Envelope::fail("filters must be an object")),
    }
}

fn arg_i64(args: &[Value], idx: usize, name: &str) -> Result<i64, Envelope> {
    arg(args, idx, name)?
        .as_i64()
        .ok_or_else(|| Envelope::fail(format!("{name} must be an integer")))
}

fn arg_str<'a>(args: &'a [Value], idx: usize, name: &str) -> Result<&'a str, Envelope> {
    arg(args, idx, name)?
        .as_str()
        .ok_or_else(|| Envelope::fail(format!("{name} must be a string")))
}

/// Numeric argument → surrogate id; string argument → business invoice_id.
fn arg_invoice_key(args: &[Value], idx: usize) -> Result<InvoiceKey, Envelope> {
    match args.get(idx) {
        Some(Value::Number(n)) if n.as_i64().is_some() => {
            Ok(InvoiceKey::Id(n.as_i64().unwrap_or_default()))
        }
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(InvoiceKey::from(s.as_str())),
        _ => Err(Envelope::fail("invoice id or invoice_id is required")),
    }
}

/// The replacement/initial item list. Missing → empty (the data layer
/// permits zero items); present → must be an array of objects.
fn arg_items(args: &[Value], idx: usize) -> Result<Vec<JsonMap>, Envelope> {
    let Some(value) = args.get(idx) else {
        return Ok(Vec::new());
    };

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(entries) => entries
            .iter()
            .map(|entry| {
                entry
                    .as_object()
                    .cloned()
                    .ok_or_else(|| Envelope::fail("each item must be an object"))
            })
            .collect(),
        _ => Err(Envelope::fail("items must be an array")),
    }
}
