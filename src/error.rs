use thiserror::Error;

#[derive(Error, Debug)]
pub enum PainelError {
    #[error("Erro de banco de dados: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("Erro de E/S: {0}")]
    Io(#[from] std::io::Error),

    #[error("Erro de CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Erro ao gerar planilha: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[cfg(feature = "xlsx")]
    #[error("Erro ao ler planilha: {0}")]
    Xlsx(#[from] calamine::Error),

    /// A column the query contract promises is absent from the fetched data.
    #[error("Coluna obrigatória ausente em '{dataset}': {column}")]
    Schema { dataset: String, column: String },

    #[error("Coluna sem rótulo de exibição: {0}")]
    UnlabeledColumn(String),

    #[error("Valor inválido na coluna '{column}' (linha {row}): '{value}'")]
    Parse {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Período inválido: início {start} é posterior ao fim {end}")]
    InvalidWindow { start: String, end: String },

    /// Deliberately identical for "does not exist" and "not allowed".
    #[error("Relatório '{0}' não encontrado ou não autorizado")]
    ReportUnavailable(String),

    #[error("Usuário ou senha incorretos")]
    Auth,

    #[error("Falha ao buscar '{dataset}': {reason}")]
    Fetch { dataset: String, reason: String },

    #[error("Erro de configuração: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PainelError>;
