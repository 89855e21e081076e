#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};
use paylane_api::params::parse_datetime;
use paylane_core::ports::{Clock, SystemClock};
use paylane_core::{ExitCode, ENV_PAYLANE_DB_PATH};
use paylane_model::{
    BudgetLimit, Currency, DiscountKind, NewPromoCode, PaymentMethod, PromoCodeId, PromoStatus,
    RestrictionSet, SegmentRule, UsageLimit,
};
use paylane_rules::{CreditService, PromoService, TransactionContext};
use paylane_store::{LedgerFilter, SqliteBackend, StoreBackend};
use rust_decimal::Decimal;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode as ProcessExitCode;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "paylane")]
#[command(about = "Paylane admin operations CLI")]
struct Cli {
    /// SQLite database file; falls back to PAYLANE_DB_PATH, then paylane.db
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    Promo {
        #[command(subcommand)]
        command: PromoCommand,
    },
    Credits {
        #[command(subcommand)]
        command: CreditsCommand,
    },
}

#[derive(Subcommand)]
enum PromoCommand {
    /// Create a promo code with an unrestricted definition
    Create {
        #[arg(long)]
        code: String,
        #[arg(long, value_parser = parse_kind)]
        kind: DiscountKind,
        #[arg(long)]
        value: Decimal,
        #[arg(long, default_value = "0")]
        min_amount: Decimal,
        #[arg(long, default_value = "USD")]
        currency: String,
        #[arg(long)]
        starts: String,
        #[arg(long)]
        ends: String,
        #[arg(long, default_value_t = -1)]
        usage_limit: i64,
    },
    /// List the promo catalog
    List,
    /// Dry-run eligibility for a proposed transfer
    Validate {
        #[arg(long)]
        code: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        source: String,
        #[arg(long)]
        dest: String,
        #[arg(long)]
        method: String,
        #[arg(long)]
        user: Option<String>,
    },
    /// Commit a redemption
    Apply {
        #[arg(long)]
        code: String,
        #[arg(long)]
        discount: Decimal,
        #[arg(long)]
        user: Option<String>,
    },
}

#[derive(Subcommand)]
enum CreditsCommand {
    /// Award a bonus scheme credit to a user
    Award {
        #[arg(long)]
        user: String,
        #[arg(long)]
        scheme: i64,
        #[arg(long)]
        transaction: Option<String>,
    },
    /// Show a user's balance and ledger history
    Balance {
        #[arg(long)]
        user: String,
    },
}

fn parse_kind(raw: &str) -> Result<DiscountKind, String> {
    DiscountKind::from_str(raw).map_err(|e| e.to_string())
}

fn db_path(cli: &Cli) -> PathBuf {
    cli.db.clone().unwrap_or_else(|| {
        std::env::var(ENV_PAYLANE_DB_PATH)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("paylane.db"))
    })
}

fn fail(message: &str, code: ExitCode) -> ProcessExitCode {
    eprintln!("error: {message}");
    ProcessExitCode::from(code as u8)
}

#[tokio::main]
async fn main() -> ProcessExitCode {
    let cli = Cli::parse();
    let store: Arc<dyn StoreBackend> = match SqliteBackend::open(&db_path(&cli)) {
        Ok(store) => Arc::new(store),
        Err(err) => return fail(&err.to_string(), ExitCode::DependencyFailure),
    };
    let clock = Arc::new(SystemClock);
    let promo_service = PromoService::new(store.clone(), clock.clone());
    let credit_service = CreditService::new(store.clone(), clock.clone());

    match cli.command {
        Commands::Promo { ref command } => match command {
            PromoCommand::Create {
                code,
                kind,
                value,
                min_amount,
                currency,
                starts,
                ends,
                usage_limit,
            } => {
                let definition = match build_promo(
                    code, *kind, *value, *min_amount, currency, starts, ends, *usage_limit,
                ) {
                    Ok(definition) => definition,
                    Err(message) => return fail(&message, ExitCode::Validation),
                };
                match store.insert_promo(definition, clock.now()).await {
                    Ok(promo) => {
                        if cli.json {
                            print_json(&json!({"promo": promo}));
                        } else {
                            println!("created promo {} (id {})", promo.code, promo.id);
                        }
                        ProcessExitCode::SUCCESS
                    }
                    Err(err) => fail(&err.to_string(), ExitCode::DependencyFailure),
                }
            }
            PromoCommand::List => match store.list_promos().await {
                Ok(promos) => {
                    if cli.json {
                        print_json(&json!({"promocodes": promos}));
                    } else {
                        for promo in promos {
                            println!(
                                "{}\t{}\t{}\tused {}",
                                promo.id,
                                promo.code,
                                promo.status.as_str(),
                                promo.usage_count
                            );
                        }
                    }
                    ProcessExitCode::SUCCESS
                }
                Err(err) => fail(&err.to_string(), ExitCode::DependencyFailure),
            },
            PromoCommand::Validate {
                code,
                amount,
                source,
                dest,
                method,
                user,
            } => {
                let ctx = match build_context(*amount, source, dest, method, user.clone()) {
                    Ok(ctx) => ctx,
                    Err(message) => return fail(&message, ExitCode::Validation),
                };
                match promo_service.validate(code, &ctx).await {
                    Ok(validated) => {
                        if cli.json {
                            print_json(&json!({
                                "valid": true,
                                "discount_amount": validated.quote.discount_amount,
                                "fee_waived": validated.quote.fee_waived,
                                "rate_boost": validated.quote.rate_boost,
                            }));
                        } else {
                            println!("valid: discount {}", validated.quote.discount_amount);
                        }
                        ProcessExitCode::SUCCESS
                    }
                    Err(err) => fail(&err.to_string(), ExitCode::Validation),
                }
            }
            PromoCommand::Apply {
                code,
                discount,
                user,
            } => {
                match promo_service
                    .apply(code, *discount, user.as_deref())
                    .await
                {
                    Ok(promo) => {
                        if cli.json {
                            print_json(&json!({
                                "applied": true,
                                "usage_count": promo.usage_count,
                                "total_discount_utilized": promo.total_discount_utilized,
                            }));
                        } else {
                            println!(
                                "applied: {} now used {} times",
                                promo.code, promo.usage_count
                            );
                        }
                        ProcessExitCode::SUCCESS
                    }
                    Err(err) => fail(&err.to_string(), ExitCode::Validation),
                }
            }
        },
        Commands::Credits { ref command } => match command {
            CreditsCommand::Award {
                user,
                scheme,
                transaction,
            } => {
                match credit_service
                    .award_bonus(user, *scheme, transaction.as_deref(), None)
                    .await
                {
                    Ok(awarded) => {
                        if cli.json {
                            print_json(&json!({
                                "amount": awarded.amount,
                                "currency": awarded.currency,
                                "expires_at": awarded.expires_at,
                            }));
                        } else {
                            println!(
                                "awarded {} {} (expires {})",
                                awarded.amount, awarded.currency, awarded.expires_at
                            );
                        }
                        ProcessExitCode::SUCCESS
                    }
                    Err(err) => fail(&err.to_string(), ExitCode::Validation),
                }
            }
            CreditsCommand::Balance { user } => {
                match credit_service.statement(user, &LedgerFilter::default()).await {
                    Ok(statement) => {
                        if cli.json {
                            print_json(&json!({
                                "balance": statement.balance,
                                "cost_incurred": statement.cost_incurred,
                                "history": statement.history,
                            }));
                        } else {
                            println!("balance: {}", statement.balance);
                            for entry in &statement.history {
                                println!(
                                    "{}\t{}\t{}\t{}",
                                    entry.created_at,
                                    entry.entry_type.as_str(),
                                    entry.amount,
                                    entry.reference_id
                                );
                            }
                        }
                        ProcessExitCode::SUCCESS
                    }
                    Err(err) => fail(&err.to_string(), ExitCode::DependencyFailure),
                }
            }
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn build_promo(
    code: &str,
    kind: DiscountKind,
    value: Decimal,
    min_amount: Decimal,
    currency: &str,
    starts: &str,
    ends: &str,
    usage_limit: i64,
) -> Result<NewPromoCode, String> {
    let definition = NewPromoCode {
        code: PromoCodeId::parse(code).map_err(|e| e.to_string())?,
        kind,
        value,
        min_amount,
        max_discount: None,
        currency: Currency::parse(currency).map_err(|e| e.to_string())?,
        usage_limit_global: UsageLimit::from_raw(usage_limit),
        usage_limit_per_user: UsageLimit::Unlimited,
        budget_limit: BudgetLimit::Unlimited,
        starts_at: parse_datetime(starts).map_err(|e| e.to_string())?,
        ends_at: parse_datetime(ends).map_err(|e| e.to_string())?,
        status: PromoStatus::Active,
        restrictions: RestrictionSet::default(),
        segment: SegmentRule::All,
    };
    definition.validate().map_err(|e| e.to_string())?;
    Ok(definition)
}

fn build_context(
    amount: Decimal,
    source: &str,
    dest: &str,
    method: &str,
    user: Option<String>,
) -> Result<TransactionContext, String> {
    let source_currency = Currency::parse(source).map_err(|e| e.to_string())?;
    Ok(TransactionContext {
        amount,
        currency: source_currency.clone(),
        source_currency,
        dest_currency: Currency::parse(dest).map_err(|e| e.to_string())?,
        payment_method: PaymentMethod::parse(method).map_err(|e| e.to_string())?,
        user_id: user,
        affiliate_id: None,
    })
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(rendered) => println!("{rendered}"),
        Err(err) => eprintln!("error: {err}"),
    }
}
