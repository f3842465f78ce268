//! Interface de linha de comando do coldline baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (run, load, report)
//! e flags globais (--interval, --timeout-mins, --verbose).

use clap::{Parser, Subcommand};

/// coldline — demonstração de online archive: provisiona, carrega, arquiva, conta.
#[derive(Debug, Parser)]
#[command(name = "coldline", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Intervalo base entre sondagens, em segundos.
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Prazo total de cada espera de sondagem, em minutos.
    #[arg(long, global = true)]
    pub timeout_mins: Option<u64>,

    /// Habilita saída detalhada (uma linha por tentativa de sondagem).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Executa o pipeline completo: cluster, dados, datas, arquivo, relatório.
    Run {
        /// Caminho para o arquivo JSON com os registros de notas.
        #[arg(long, default_value = "student_grades.json")]
        data: String,
    },

    /// Carrega e normaliza o dataset em um cluster já existente.
    Load {
        /// Nome do cluster alvo.
        cluster: String,

        /// Caminho para o arquivo JSON com os registros de notas.
        #[arg(long, default_value = "student_grades.json")]
        data: String,
    },

    /// Conta documentos vivos e arquivados de um cluster já existente.
    Report {
        /// Nome do cluster alvo.
        cluster: String,
    },
}
