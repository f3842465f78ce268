//! Interface de terminal do coldline — spinners e saída colorida.
//!
//! Usa as crates `indicatif` para spinners de progresso e `console` para
//! estilização com cores. O [`StageProgress`] acompanha visualmente uma
//! etapa do pipeline no terminal, incluindo as mensagens de espera dos
//! laços de sondagem.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::report::RunReport;

/// Indicador visual de progresso para uma etapa do pipeline.
///
/// Exibe um spinner animado durante a etapa e mensagens coloridas para
/// sucesso (verde), falha (vermelho) e esperas de sondagem (amarelo).
pub struct StageProgress {
    // Barra de progresso/spinner do indicatif.
    pb: ProgressBar,
    // Estilo verde para mensagens de sucesso.
    green: Style,
    // Estilo vermelho para mensagens de falha.
    red: Style,
    // Estilo amarelo para mensagens de espera.
    yellow: Style,
    // Quando verbose, cada tentativa de sondagem vira uma linha própria.
    verbose: bool,
}

impl StageProgress {
    /// Inicia o spinner com o nome da etapa e um detalhe livre.
    pub fn start(stage: &str, detail: &str) -> Self {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("invalid template"),
        );
        pb.set_message(format!("{stage}: {detail}"));
        pb.enable_steady_tick(std::time::Duration::from_millis(100));

        Self {
            pb,
            green: Style::new().green().bold(),
            red: Style::new().red().bold(),
            yellow: Style::new().yellow(),
            verbose: false,
        }
    }

    /// Habilita uma linha por tentativa de sondagem.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Registra uma tentativa de sondagem que ainda não viu a condição terminal.
    pub fn waiting(&self, attempt: u32, status: &str) {
        if self.verbose {
            self.pb.println(format!(
                "  {} {attempt}.) {status}",
                self.yellow.apply_to("…")
            ));
        }
        self.pb.set_message(format!("{attempt}.) {status}"));
    }

    /// Finaliza o spinner com uma mensagem de sucesso.
    pub fn done(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.green.apply_to("✓"));
    }

    /// Finaliza o spinner com uma mensagem de falha.
    pub fn failed(&self, message: &str) {
        self.pb.finish_and_clear();
        println!("  {} {message}", self.red.apply_to("✗"));
    }

    /// Imprime o relatório da execução formatado em JSON.
    pub fn print_report(record: &RunReport) {
        let style = if record.balanced {
            Style::new().green().bold()
        } else {
            Style::new().yellow().bold()
        };
        println!();
        println!("{}", style.apply_to("─── Run Report ───"));
        println!(
            "{}",
            serde_json::to_string_pretty(record).unwrap_or_default()
        );
        if !record.balanced {
            println!(
                "{}",
                Style::new().yellow().apply_to(
                    "warning: live + archived counts do not add up to the pre-archive count"
                )
            );
        }
    }
}
