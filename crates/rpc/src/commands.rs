//! CLI commands

use chrono::Utc;
use payvault_core::Amount;
use payvault_gateway::{resolve, EnvSecrets, ProcessorId};
use payvault_purchase::{
    can_download, days_until_expiry, generate_transaction_id, remaining_downloads, NewPurchase,
    PaymentGateway, PaymentMethod, ProductSnapshot, PurchaseRecord,
};
use rust_decimal::Decimal;

use crate::context::AppContext;

/// Create a purchase record (status starts pending)
#[allow(clippy::too_many_arguments)]
pub fn purchase_create(
    ctx: &AppContext,
    buyer: &str,
    product: &str,
    amount: Decimal,
    method: &str,
    gateway: &str,
    transaction_id: Option<&str>,
    product_name: Option<&str>,
) -> Result<(), anyhow::Error> {
    let method = PaymentMethod::from_str(method)
        .ok_or_else(|| anyhow::anyhow!("unknown payment method: {method}"))?;
    let gateway = PaymentGateway::from_str(gateway)
        .ok_or_else(|| anyhow::anyhow!("unknown payment gateway: {gateway}"))?;
    let transaction_id = transaction_id
        .map(str::to_string)
        .unwrap_or_else(generate_transaction_id);

    let mut new = NewPurchase::new(
        buyer,
        product,
        &transaction_id,
        Amount::positive(amount)?,
        method,
        gateway,
    );
    if let Some(name) = product_name {
        new = new.with_snapshot(ProductSnapshot {
            name: name.to_string(),
            sku: product.to_string(),
            version: String::new(),
        });
    }

    let record = ctx.purchases.create(new)?;

    println!(
        "✅ Purchase created: {} ({} via {}, status: {})",
        record.transaction_id,
        record.amount,
        record.payment_gateway.as_str(),
        record.payment_status
    );
    Ok(())
}

/// Record the gateway callback for a purchase
pub fn purchase_gateway_result(
    ctx: &AppContext,
    transaction_id: &str,
    gateway_transaction_id: Option<&str>,
    gateway_order_id: Option<&str>,
    success: bool,
) -> Result<(), anyhow::Error> {
    let record = ctx.purchases.record_gateway_result(
        transaction_id,
        gateway_transaction_id,
        gateway_order_id,
        success,
    )?;

    println!(
        "✅ Gateway result recorded: {} is now {}",
        record.transaction_id, record.payment_status
    );
    Ok(())
}

/// Register a download against a purchase
pub fn purchase_download(
    ctx: &AppContext,
    transaction_id: &str,
    ip_address: &str,
    user_agent: &str,
) -> Result<(), anyhow::Error> {
    let record = ctx
        .purchases
        .register_download(transaction_id, ip_address, user_agent)?;

    println!(
        "✅ Download registered for {} ({} of {} used, {} remaining)",
        record.transaction_id,
        record.download_attempts,
        record.max_downloads,
        remaining_downloads(&record)
    );
    Ok(())
}

/// Refund a completed purchase
pub fn purchase_refund(
    ctx: &AppContext,
    transaction_id: &str,
    amount: Decimal,
    reason: &str,
    refund_transaction_id: Option<&str>,
) -> Result<(), anyhow::Error> {
    let record = ctx.purchases.refund(
        transaction_id,
        Amount::positive(amount)?,
        reason,
        refund_transaction_id,
    )?;

    println!(
        "✅ Refunded {} on {} (status: {})",
        amount, record.transaction_id, record.payment_status
    );
    Ok(())
}

/// Show a purchase record with its derived entitlement state
pub fn purchase_show(ctx: &AppContext, transaction_id: &str) -> Result<(), anyhow::Error> {
    let record = ctx.purchases.get(transaction_id)?;
    print_purchase(&record);
    Ok(())
}

fn print_purchase(record: &PurchaseRecord) {
    let now = Utc::now();
    println!("{}", serde_json::to_string_pretty(record).unwrap_or_default());
    println!("  canDownload:        {}", can_download(record, now));
    println!("  remainingDownloads: {}", remaining_downloads(record));
    println!("  daysUntilExpiry:    {}", days_until_expiry(record, now));
}

/// Submit a loan application
pub fn loan_submit(
    ctx: &AppContext,
    applicant: &str,
    amount: Decimal,
    reason: &str,
) -> Result<(), anyhow::Error> {
    let loan = ctx.loans.submit(applicant, Amount::positive(amount)?, reason)?;

    println!("✅ Loan submitted: {} ({} for {})", loan.id, loan.amount, loan.applicant);
    Ok(())
}

/// Approve or reject a pending loan
pub fn loan_decide(
    ctx: &AppContext,
    loan_id: &str,
    reviewer: &str,
    approve: bool,
    reason: Option<&str>,
) -> Result<(), anyhow::Error> {
    let loan = ctx.loans.decide(loan_id, reviewer, approve, reason)?;

    println!("✅ Loan {} is now {}", loan.id, loan.status);
    Ok(())
}

/// Disburse an approved loan
pub fn loan_disburse(ctx: &AppContext, loan_id: &str) -> Result<(), anyhow::Error> {
    let loan = ctx.loans.disburse(loan_id)?;

    println!("✅ Loan {} disbursed", loan.id);
    Ok(())
}

/// Show a loan record
pub fn loan_show(ctx: &AppContext, loan_id: &str) -> Result<(), anyhow::Error> {
    let loan = ctx.loans.store().get(loan_id)?;
    println!("{}", serde_json::to_string_pretty(&loan)?);
    Ok(())
}

/// List pending loan applications
pub fn loan_pending(ctx: &AppContext) -> Result<(), anyhow::Error> {
    let pending = ctx.loans.list_pending()?;
    if pending.is_empty() {
        println!("No pending loans");
        return Ok(());
    }
    for loan in pending {
        println!("{}  {}  {}  {}", loan.id, loan.applicant, loan.amount, loan.reason);
    }
    Ok(())
}

/// Show a resolved processor profile (secrets redacted)
pub fn gateway_show(processor: &str) -> Result<(), anyhow::Error> {
    let id: ProcessorId = processor.parse()?;
    let profile = resolve(id, &EnvSecrets);

    let present = |s: &Option<payvault_gateway::Secret>| if s.is_some() { "set" } else { "unset" };

    println!("Processor:       {}", profile.processor);
    println!("Base URL:        {}", profile.base_url);
    println!("Currency:        {}", profile.currency);
    println!("Timeout:         {}ms", profile.timeout_ms);
    println!("Retry attempts:  {}", profile.retry_attempts);
    println!("API key:         {}", present(&profile.api_key));
    println!("Client id:       {}", present(&profile.client_id));
    println!("Client secret:   {}", present(&profile.client_secret));
    println!("Webhook secret:  {}", present(&profile.webhook_secret));
    println!("Endpoints:");
    println!("  DEBIT:          {}", profile.endpoints.debit);
    println!("  CREDIT:         {}", profile.endpoints.credit);
    println!("  STATUS:         {}", profile.endpoints.status);
    println!("  REFUND:         {}", profile.endpoints.refund);
    println!("  VERIFY_ACCOUNT: {}", profile.endpoints.verify_account);
    println!(
        "Production ready: {}",
        if profile.is_production_ready() { "yes" } else { "no" }
    );
    Ok(())
}
