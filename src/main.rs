use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use prodtrack_app_lib::commands::{
    catalog, dashboard, metrics, production, reports, session, AppState,
};
use prodtrack_app_lib::models::metrics::RollupDenominator;
use prodtrack_app_lib::models::product::{ProductCreateInput, ProductKind};
use prodtrack_app_lib::models::production::{ProductionCreateInput, ProductionDetailInput};
use prodtrack_app_lib::models::report::{ReportGrouping, ReportParams};
use prodtrack_app_lib::models::session::LoginInput;

#[derive(Parser)]
#[command(name = "prodtrack")]
#[command(version, about = "Seguimiento de producción por turno")]
struct Cli {
    /// YAML configuration file; defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the first administrator on an empty database
    Bootstrap {
        cedula: String,
        full_name: String,
        #[arg(long)]
        password: String,
    },
    Login {
        cedula: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Whoami,
    /// Register a machine (admin)
    MachineAdd {
        name: String,
        #[arg(long)]
        category: Option<String>,
    },
    /// Register a product with its shift thresholds (admin)
    ProductAdd {
        name: String,
        /// general, tree_tied, tree or ornament
        #[arg(long, default_value = "general", value_parser = parse_kind)]
        kind: ProductKind,
        #[arg(long = "target-8h")]
        target_8h: Option<f64>,
        #[arg(long = "target-10h")]
        target_10h: Option<f64>,
        #[arg(long)]
        general_target: Option<f64>,
    },
    /// Record one shift; each --line is PRODUCT=QTY or PRODUCT@DESIGN=QTY
    Submit {
        #[arg(long)]
        date: String,
        #[arg(long, default_value = "8 horas")]
        shift: String,
        #[arg(long)]
        machine: i64,
        /// Defaults to the signed-in operator
        #[arg(long)]
        operator: Option<i64>,
        #[arg(long = "line", required = true, value_parser = parse_line)]
        lines: Vec<ProductionDetailInput>,
        #[arg(long = "assistant")]
        assistants: Vec<i64>,
        /// The operator worked the shift as an assistant
        #[arg(long)]
        as_assistant: bool,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Compliance summary for one operator
    Metrics {
        #[arg(long)]
        cedula: Option<String>,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Divide by the expected working days instead of the days worked
        #[arg(long)]
        bonus: bool,
    },
    /// Every operator ranked by mean compliance (admin)
    Ranking {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long)]
        bonus: bool,
    },
    /// Write the production spreadsheet for a date range
    Export {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[arg(long, value_enum, default_value = "category")]
        by: GroupingArg,
        /// Restrict to a single category
        #[arg(long)]
        category: Option<String>,
    },
    /// Print one production record as PDF
    RecordPdf { record_id: i64 },
    Dashboard,
}

#[derive(Clone, Copy, ValueEnum)]
enum GroupingArg {
    Category,
    Machine,
}

impl From<GroupingArg> for ReportGrouping {
    fn from(value: GroupingArg) -> Self {
        match value {
            GroupingArg::Category => ReportGrouping::Category,
            GroupingArg::Machine => ReportGrouping::Machine,
        }
    }
}

fn denominator(bonus: bool) -> Option<RollupDenominator> {
    Some(if bonus {
        RollupDenominator::ExpectedWorkingDays
    } else {
        RollupDenominator::WorkedDays
    })
}

fn parse_kind(value: &str) -> Result<ProductKind, String> {
    ProductKind::parse(value).map_err(|err| err.to_string())
}

fn parse_line(value: &str) -> Result<ProductionDetailInput, String> {
    let (product, quantity) = value
        .split_once('=')
        .ok_or_else(|| format!("se esperaba PRODUCTO=CANTIDAD: {value}"))?;
    let (product, design) = match product.split_once('@') {
        Some((product, design)) => (product, Some(design)),
        None => (product, None),
    };
    let parse_id = |raw: &str| {
        raw.trim()
            .parse::<i64>()
            .map_err(|_| format!("identificador inválido: {raw}"))
    };
    Ok(ProductionDetailInput {
        product_id: parse_id(product)?,
        design_id: design.map(parse_id).transpose()?,
        quantity: quantity
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("cantidad inválida: {quantity}"))?,
    })
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli).await {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let state: AppState = prodtrack_app_lib::bootstrap(cli.config.as_deref())?;

    match cli.command {
        Command::Bootstrap {
            cedula,
            full_name,
            password,
        } => print_json(&catalog::admin_bootstrap(&state, cedula, full_name, password).await?),
        Command::Login { cedula, password } => {
            let session = session::session_login(&state, LoginInput { cedula, password }).await?;
            print_json(&session)
        }
        Command::Logout => {
            session::session_logout(&state).await?;
            println!("sesión cerrada");
            Ok(())
        }
        Command::Whoami => print_json(&session::session_require(&state)?),
        Command::MachineAdd { name, category } => {
            print_json(&catalog::machine_create(&state, name, category).await?)
        }
        Command::ProductAdd {
            name,
            kind,
            target_8h,
            target_10h,
            general_target,
        } => {
            let input = ProductCreateInput {
                name,
                kind,
                target_8h,
                target_10h,
                general_target,
            };
            print_json(&catalog::product_create(&state, input).await?)
        }
        Command::Submit {
            date,
            shift,
            machine,
            operator,
            lines,
            assistants,
            as_assistant,
            notes,
        } => {
            let operator_id = match operator {
                Some(id) => id,
                None => session::session_require(&state)?.operator_id,
            };
            let input = ProductionCreateInput {
                date,
                shift,
                machine_id: machine,
                operator_id,
                is_assistant: as_assistant,
                assistant_ids: assistants,
                details: lines,
                notes,
            };
            print_json(&production::production_submit(&state, input).await?)
        }
        Command::Metrics {
            cedula,
            from,
            to,
            bonus,
        } => {
            let query = metrics::MetricsQuery {
                cedula,
                from,
                to,
                denominator: denominator(bonus),
            };
            print_json(&metrics::metrics_summary_fetch(&state, query).await?)
        }
        Command::Ranking { from, to, bonus } => {
            let query = metrics::RankingQuery {
                from,
                to,
                denominator: denominator(bonus),
            };
            print_json(&metrics::metrics_ranking_fetch(&state, query).await?)
        }
        Command::Export {
            from,
            to,
            by,
            category,
        } => {
            let params = ReportParams {
                from,
                to,
                grouping: by.into(),
                category,
            };
            print_json(&reports::report_export(&state, params).await?)
        }
        Command::RecordPdf { record_id } => {
            print_json(&reports::registration_pdf_export(&state, record_id).await?)
        }
        Command::Dashboard => print_json(&dashboard::dashboard_snapshot_fetch(&state).await?),
    }
}
