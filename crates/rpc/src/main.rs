//! PayVault CLI - Main entry point

use clap::{Parser, Subcommand};
use payvault_rpc::{commands, AppContext};
use rust_decimal::Decimal;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "payvault")]
#[command(about = "PayVault - purchase, loan and gateway operations", long_about = None)]
struct Cli {
    /// Data directory path
    #[arg(short, long, default_value = "./data")]
    data: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Purchase record operations
    Purchase {
        #[command(subcommand)]
        command: PurchaseCommands,
    },

    /// Loan application operations
    Loan {
        #[command(subcommand)]
        command: LoanCommands,
    },

    /// Show the resolved profile for a processor
    Gateway {
        /// Processor key (generic-bank, icici, hdfc, sbi, stripe, razorpay)
        processor: String,
    },
}

#[derive(Subcommand)]
enum PurchaseCommands {
    /// Create a purchase (status starts pending)
    Create {
        /// Buyer user ID
        buyer: String,
        /// Product ID
        product: String,
        /// Purchase amount
        amount: Decimal,
        /// Payment method (card, upi, netbanking, wallet, emi)
        #[arg(long, default_value = "card")]
        method: String,
        /// Payment gateway (razorpay, stripe, paytm, phonepe)
        #[arg(long, default_value = "razorpay")]
        gateway: String,
        /// Internal transaction ID (generated when omitted)
        #[arg(long)]
        transaction_id: Option<String>,
        /// Product display name for the metadata snapshot
        #[arg(long)]
        product_name: Option<String>,
    },

    /// Record the gateway callback for a purchase
    GatewayResult {
        /// Internal transaction ID
        transaction_id: String,
        /// Whether the payment succeeded
        #[arg(long)]
        success: bool,
        /// Gateway transaction ID
        #[arg(long)]
        gateway_transaction_id: Option<String>,
        /// Gateway order ID
        #[arg(long)]
        gateway_order_id: Option<String>,
    },

    /// Register a download against a purchase
    Download {
        /// Internal transaction ID
        transaction_id: String,
        /// Client IP address
        #[arg(long, default_value = "0.0.0.0")]
        ip: String,
        /// Client user agent
        #[arg(long, default_value = "payvault-cli")]
        user_agent: String,
    },

    /// Refund a completed purchase
    Refund {
        /// Internal transaction ID
        transaction_id: String,
        /// Refund amount
        amount: Decimal,
        /// Refund reason
        #[arg(long, default_value = "customer request")]
        reason: String,
        /// Processor-side refund ID
        #[arg(long)]
        refund_transaction_id: Option<String>,
    },

    /// Show a purchase with derived entitlement state
    Show {
        /// Internal transaction ID
        transaction_id: String,
    },
}

#[derive(Subcommand)]
enum LoanCommands {
    /// Submit a loan application
    Submit {
        /// Applicant user ID
        applicant: String,
        /// Loan amount
        amount: Decimal,
        /// Stated purpose
        #[arg(long, default_value = "")]
        reason: String,
    },

    /// Approve a pending loan
    Approve {
        /// Loan ID
        loan_id: String,
        /// Reviewing admin ID
        #[arg(long)]
        reviewer: String,
        /// Decision note
        #[arg(long)]
        reason: Option<String>,
    },

    /// Reject a pending loan
    Reject {
        /// Loan ID
        loan_id: String,
        /// Reviewing admin ID
        #[arg(long)]
        reviewer: String,
        /// Decision note
        #[arg(long)]
        reason: Option<String>,
    },

    /// Disburse an approved loan
    Disburse {
        /// Loan ID
        loan_id: String,
    },

    /// Show a loan record
    Show {
        /// Loan ID
        loan_id: String,
    },

    /// List pending loan applications
    Pending,
}

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let ctx = AppContext::new(&cli.data)?;

    match cli.command {
        Commands::Purchase { command } => match command {
            PurchaseCommands::Create {
                buyer,
                product,
                amount,
                method,
                gateway,
                transaction_id,
                product_name,
            } => {
                commands::purchase_create(
                    &ctx,
                    &buyer,
                    &product,
                    amount,
                    &method,
                    &gateway,
                    transaction_id.as_deref(),
                    product_name.as_deref(),
                )?;
            }

            PurchaseCommands::GatewayResult {
                transaction_id,
                success,
                gateway_transaction_id,
                gateway_order_id,
            } => {
                commands::purchase_gateway_result(
                    &ctx,
                    &transaction_id,
                    gateway_transaction_id.as_deref(),
                    gateway_order_id.as_deref(),
                    success,
                )?;
            }

            PurchaseCommands::Download {
                transaction_id,
                ip,
                user_agent,
            } => {
                commands::purchase_download(&ctx, &transaction_id, &ip, &user_agent)?;
            }

            PurchaseCommands::Refund {
                transaction_id,
                amount,
                reason,
                refund_transaction_id,
            } => {
                commands::purchase_refund(
                    &ctx,
                    &transaction_id,
                    amount,
                    &reason,
                    refund_transaction_id.as_deref(),
                )?;
            }

            PurchaseCommands::Show { transaction_id } => {
                commands::purchase_show(&ctx, &transaction_id)?;
            }
        },

        Commands::Loan { command } => match command {
            LoanCommands::Submit {
                applicant,
                amount,
                reason,
            } => {
                commands::loan_submit(&ctx, &applicant, amount, &reason)?;
            }

            LoanCommands::Approve {
                loan_id,
                reviewer,
                reason,
            } => {
                commands::loan_decide(&ctx, &loan_id, &reviewer, true, reason.as_deref())?;
            }

            LoanCommands::Reject {
                loan_id,
                reviewer,
                reason,
            } => {
                commands::loan_decide(&ctx, &loan_id, &reviewer, false, reason.as_deref())?;
            }

            LoanCommands::Disburse { loan_id } => {
                commands::loan_disburse(&ctx, &loan_id)?;
            }

            LoanCommands::Show { loan_id } => {
                commands::loan_show(&ctx, &loan_id)?;
            }

            LoanCommands::Pending => {
                commands::loan_pending(&ctx)?;
            }
        },

        Commands::Gateway { processor } => {
            commands::gateway_show(&processor)?;
        }
    }

    Ok(())
}
