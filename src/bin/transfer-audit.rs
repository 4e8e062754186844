//! CLI binary for transfer-audit.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `AnalysisConfig`, shows the phase labels on a spinner and prints the
//! eligibility report as a text card or JSON.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use transfer_audit::{
    analyze, audit_prompt, format_brl, report_schema, AnalysisConfig, AnalysisPhase,
    AnalysisProgressCallback, AnalysisResult, EligibilityReport, Institution, RenderSupport,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the current phase label.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_message("Lendo documento...");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }
}

impl AnalysisProgressCallback for CliProgressCallback {
    fn on_phase(&self, _phase: AnalysisPhase, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn on_analysis_complete(&self, _report: &EligibilityReport) {
        self.bar.finish_and_clear();
    }

    fn on_analysis_failed(&self, _message: &str) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Analyze a paycheck (PDF, JPG or PNG)
  transfer-audit contracheque.pdf

  # Photographed paycheck, JSON output
  transfer-audit --json foto_holerite.jpg > laudo.json

  # Send images without the legibility filter
  transfer-audit --no-enhance scan.png

  # Another vision provider through edgequake-llm
  transfer-audit --provider openai --model gpt-4.1 contracheque.pdf

  # Show the rulebook prompt or the output schema
  transfer-audit --print-prompt
  transfer-audit --print-schema

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY            Generative-language API key (API_KEY also accepted)
  TRANSFER_AUDIT_MODEL      Override model ID (default gemini-3-pro-preview)
  TRANSFER_AUDIT_PROVIDER   Use a non-Gemini provider (openai, anthropic, ollama, ...)
  TRANSFER_AUDIT_ENDPOINT   Override the Gemini REST endpoint
  OPENAI_API_KEY, ANTHROPIC_API_KEY, ...
                            Credentials read by the selected provider
"#;

/// Audit a paycheck for debt-transfer eligibility using a vision model.
#[derive(Parser, Debug)]
#[command(
    name = "transfer-audit",
    version,
    about = "Audit a paycheck for payroll-loan debt-transfer eligibility",
    long_about = "Send a paycheck (PDF, JPG or PNG) to a generative vision model together with the \
debt-transfer rulebook and print the structured eligibility report: legibility, institution, \
net income tier, PREC/CAT/IND or matrícula, existing debts, blocked creditors and the technical opinion.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Paycheck file: PDF, JPG or PNG.
    #[arg(required_unless_present_any = ["print_prompt", "print_schema"])]
    file: Option<PathBuf>,

    /// Model ID.
    #[arg(long, env = "TRANSFER_AUDIT_MODEL")]
    model: Option<String>,

    /// Provider: gemini (default, REST with structured output) or any
    /// edgequake-llm provider name.
    #[arg(long, env = "TRANSFER_AUDIT_PROVIDER")]
    provider: Option<String>,

    /// Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Gemini REST endpoint.
    #[arg(long, env = "TRANSFER_AUDIT_ENDPOINT")]
    endpoint: Option<String>,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "TRANSFER_AUDIT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Max output tokens.
    #[arg(long, env = "TRANSFER_AUDIT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// HTTP timeout for the service call in seconds (default: none).
    #[arg(long, env = "TRANSFER_AUDIT_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// Send images as-is, without the grayscale/contrast filter.
    #[arg(long)]
    no_enhance: bool,

    /// Output the full result (report, findings, metadata) as JSON.
    #[arg(long)]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "TRANSFER_AUDIT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long)]
    verbose: bool,

    /// Suppress all output except the report and errors.
    #[arg(short, long)]
    quiet: bool,

    /// Print the audit prompt and exit.
    #[arg(long)]
    print_prompt: bool,

    /// Print the report JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Constant outputs ─────────────────────────────────────────────────
    if cli.print_prompt {
        println!("{}", audit_prompt());
        return Ok(());
    }
    if cli.print_schema {
        println!(
            "{}",
            serde_json::to_string_pretty(report_schema()).context("Failed to serialise schema")?
        );
        return Ok(());
    }

    let file = cli.file.clone().context("No paycheck file given")?;
    let config = build_config(&cli, show_progress)?;

    // ── Run analysis ─────────────────────────────────────────────────────
    let result = match analyze(&file, &config).await {
        Ok(r) => r,
        Err(e) => {
            if cli.verbose {
                eprintln!("{}", dim(&e.to_string()));
            }
            anyhow::bail!("{}", e.user_message());
        }
    };

    if cli.json {
        let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
        println!("{json}");
    } else {
        print!("{}", render_card(&result));
        if !cli.quiet {
            eprintln!(
                "{}",
                dim(&format!(
                    "{} · {} in / {} out tokens · {}ms",
                    result.media_type,
                    tokens(result.input_tokens),
                    tokens(result.output_tokens),
                    result.duration_ms
                ))
            );
        }
    }

    Ok(())
}

fn tokens(n: Option<u64>) -> String {
    n.map_or_else(|| "?".to_string(), |n| n.to_string())
}

/// Map CLI args to `AnalysisConfig`.
fn build_config(cli: &Cli, show_progress: bool) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens);

    if let Some(ref m) = cli.model {
        builder = builder.model(m);
    }
    if let Some(ref p) = cli.provider {
        builder = builder.provider_name(p);
    }
    if let Some(ref k) = cli.api_key {
        builder = builder.api_key(k);
    }
    if let Some(ref e) = cli.endpoint {
        builder = builder.endpoint(e);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if cli.no_enhance {
        builder = builder.render_support(RenderSupport::Unavailable);
    }
    if show_progress {
        builder = builder.progress_callback(CliProgressCallback::new());
    }

    builder.build().context("Invalid configuration")
}

// ── Result card ──────────────────────────────────────────────────────────────

fn or_unknown(v: Option<&str>) -> &str {
    v.filter(|s| !s.trim().is_empty()).unwrap_or("Não identificado")
}

fn render_card(result: &AnalysisResult) -> String {
    let r = &result.report;
    let d = &r.dados_extraidos;
    let mut out = String::new();
    let mut line = |s: String| {
        out.push_str(&s);
        out.push('\n');
    };

    let legivel = if r.legivel {
        green("✔ Doc. Legível")
    } else {
        red("✘ Doc. Ilegível")
    };
    let elegivel = if r.elegivel {
        green("✔ Transfer Liberado")
    } else {
        red("✘ Transfer Recusado")
    };
    line(format!("{legivel}    {elegivel}"));
    line(String::new());
    line(format!("{}  [{}]", bold("Auditoria de Dados"), r.orgao));
    line(format!("  Nome:             {}", or_unknown(d.nome.as_deref())));
    line(format!("  CPF:              {}", or_unknown(d.cpf.as_deref())));
    if r.institution() == Institution::Army {
        line(format!(
            "  PREC / CAT / IND: {}",
            or_unknown(d.prec_cat_ind.as_deref())
        ));
    } else {
        line(format!(
            "  Matrícula:        {}",
            or_unknown(d.matricula.as_deref())
        ));
    }

    let liquido = d.liquido.map_or_else(|| "N/A".to_string(), format_brl);
    line(format!("  Líquido Atual:    {}", bold(&liquido)));
    if let Some(ref faixa) = d.faixa_operacao {
        line(format!("  Faixa:            {faixa}"));
    }
    if r.below_minimum_income() {
        line(red(
            "  ⚠ Líquido insuficiente para compra (Regra Mínima: R$ 100,00)",
        ));
    }

    line(String::new());
    line(bold("Dívidas Atuais (Carteira)"));
    if d.dividas_identificadas.is_empty() {
        line(dim(
            "  Nenhum desconto bancário identificado para portabilidade.",
        ));
    }
    for debt in &d.dividas_identificadas {
        let valor = debt
            .valor_parcela
            .filter(|v| *v != 0.0)
            .map_or_else(|| "Valor n/d".to_string(), format_brl);
        let prazo = debt
            .prazo_restante
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or("n/d");
        line(format!("  • {:<32} {:>14}  Prazo: {}", debt.banco, valor, prazo));
    }

    if r.alerta_bancos_bloqueados {
        line(String::new());
        line(red(&bold("Banco Restrito Encontrado")));
        line(
            "  O cliente possui parcelas de bancos que NÃO são aceitos na nossa esteira de \
Compra de Dívida (ex: Sabemi, Capital Consig, Inbursa, Simpala, etc). Certifique-se de não \
tentar portar estas parcelas específicas."
                .to_string(),
        );
    }

    line(String::new());
    let heading = "Parecer Técnico (Compra de Dívida)";
    if r.elegivel && !r.alerta_bancos_bloqueados {
        line(green(&bold(heading)));
    } else {
        line(yellow(&bold(heading)));
    }
    line(format!("  {}", r.motivo));

    if !result.findings.is_empty() {
        line(String::new());
        line(yellow("Verificações locais divergentes:"));
        for f in &result.findings {
            line(format!("  ! {f}"));
        }
    }

    out
}
