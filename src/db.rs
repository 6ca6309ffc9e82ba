use std::path::Path;

use chrono::{Duration, NaiveDate};
use rusqlite::Connection;

use crate::error::Result;
use crate::models::months_back;

/// Local mirror of the warehouse tables queried by [`crate::warehouse::DatasetKind`].
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS estoque (
    n_da_nota INTEGER NOT NULL,
    valor_da_nota REAL,
    data_cotada TEXT NOT NULL,
    cliente TEXT,
    vendedor TEXT NOT NULL,
    empresa TEXT,
    produto TEXT,
    caracteristica TEXT,
    cotado REAL,
    estoque REAL,
    pos_cotacao REAL
);

CREATE TABLE IF NOT EXISTS inadimplencia (
    codigo_parceiro INTEGER NOT NULL,
    nome_parceiro TEXT,
    vendedor TEXT NOT NULL,
    data_de_vencimento TEXT NOT NULL,
    numero_da_nota INTEGER,
    valor_da_nota REAL,
    descricao_oper TEXT,
    numero_parcela INTEGER,
    tipo_de_titulo TEXT,
    dias_vencidos INTEGER,
    valor_parcela REAL
);

CREATE TABLE IF NOT EXISTS contatos (
    codparc INTEGER NOT NULL,
    apelido TEXT NOT NULL,
    nomeparc TEXT,
    telemarketing_feito TEXT,
    cotacao_feita TEXT,
    contactou_ou_nao TEXT,
    ult_tele TEXT,
    ult_cotacao TEXT,
    ult_venda TEXT,
    venda_feita TEXT,
    melhor_dia TEXT
);

CREATE TABLE IF NOT EXISTS comissoes (
    vendedor TEXT NOT NULL,
    numero_da_nota INTEGER,
    nome_parceiro TEXT,
    data_da_baixa TEXT NOT NULL,
    valor_da_nota REAL,
    valor_comissao REAL
);
";

const DEMO_SALESPEOPLE: &[&str] = &["ANA", "BRUNO", "CARLA"];

const DEMO_CUSTOMERS: &[&str] = &[
    "Padaria Sol Nascente",
    "Mercado Bom Preço",
    "Confeitaria Doce Lar",
    "Restaurante Sabor Caseiro",
    "Lanchonete Esquina",
    "Hotel Vista Mar",
    "Pizzaria Forno a Lenha",
    "Cantina Bella Italia",
];

const DEMO_PRODUCTS: &[(&str, &str)] = &[
    ("Farinha de Trigo", "Tipo 1"),
    ("Açúcar Refinado", "Pacote 5kg"),
    ("Fermento Biológico", "Seco"),
    ("Margarina", "80% lipídios"),
];

const WEEKDAYS: &[&str] = &["Segunda", "Terça", "Quarta", "Quinta", "Sexta"];

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    // Rollback journal: the reports open this file read-only, which WAL would not allow
    // without a writable -shm file next to it.
    conn.execute_batch("PRAGMA journal_mode=DELETE;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Fill the mirror with sample rows dated relative to `today`. Existing rows are replaced.
pub fn seed_demo(conn: &Connection, today: NaiveDate) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    for table in ["estoque", "inadimplencia", "contatos", "comissoes"] {
        tx.execute(&format!("DELETE FROM {table}"), [])?;
    }

    // Every fourth quote is covered by stock and is filtered out by the report.
    for i in 0..18i64 {
        let vendedor = DEMO_SALESPEOPLE[i as usize % DEMO_SALESPEOPLE.len()];
        let cliente = DEMO_CUSTOMERS[i as usize % DEMO_CUSTOMERS.len()];
        let (produto, caracteristica) = DEMO_PRODUCTS[i as usize % DEMO_PRODUCTS.len()];
        let data = today - Duration::days(i * 3);
        let cotado = 100.0 + (i * 25) as f64;
        let estoque = if i % 4 == 0 { cotado + 50.0 } else { cotado - 40.0 - (i * 5) as f64 };
        tx.execute(
            "INSERT INTO estoque (n_da_nota, valor_da_nota, data_cotada, cliente, vendedor, empresa, produto, caracteristica, cotado, estoque, pos_cotacao) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                5000 + i,
                cotado * 7.35,
                data.format("%d/%m/%Y").to_string(),
                cliente,
                vendedor,
                if i % 2 == 0 { "Matriz" } else { "Filial" },
                produto,
                caracteristica,
                cotado,
                estoque,
                estoque - cotado,
            ],
        )?;
    }

    for i in 0..15i64 {
        let vendedor = DEMO_SALESPEOPLE[i as usize % DEMO_SALESPEOPLE.len()];
        let vencimento = today - Duration::days(20 + i * 11);
        let parcela = 1 + i % 3;
        tx.execute(
            "INSERT INTO inadimplencia (codigo_parceiro, nome_parceiro, vendedor, data_de_vencimento, numero_da_nota, valor_da_nota, descricao_oper, numero_parcela, tipo_de_titulo, dias_vencidos, valor_parcela) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                300 + i % 8,
                DEMO_CUSTOMERS[i as usize % DEMO_CUSTOMERS.len()],
                vendedor,
                vencimento.format("%Y-%m-%d").to_string(),
                7000 + i,
                1500.0 + (i * 130) as f64,
                "Venda de mercadoria",
                parcela,
                if i % 2 == 0 { "Boleto" } else { "Duplicata" },
                (today - vencimento).num_days(),
                (1500.0 + (i * 130) as f64) / 3.0,
            ],
        )?;
    }

    for i in 0..24i64 {
        let apelido = DEMO_SALESPEOPLE[i as usize % DEMO_SALESPEOPLE.len()];
        let contacted = i % 4 != 0 && i % 5 != 0;
        let sim_nao = |b: bool| if b { "Sim" } else { "Não" };
        let ult = |offset: i64| (today - Duration::days(offset)).format("%Y-%m-%d").to_string();
        tx.execute(
            "INSERT INTO contatos (codparc, apelido, nomeparc, telemarketing_feito, cotacao_feita, contactou_ou_nao, ult_tele, ult_cotacao, ult_venda, venda_feita, melhor_dia) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            rusqlite::params![
                900 + i,
                apelido,
                format!("{} {}", DEMO_CUSTOMERS[i as usize % DEMO_CUSTOMERS.len()], i + 1),
                sim_nao(contacted && i % 2 == 0),
                sim_nao(contacted && i % 3 != 0),
                if contacted { "Contactou" } else { "Não contactou" },
                contacted.then(|| ult(i % 20)),
                (i % 3 != 0).then(|| ult(10 + i)),
                (i % 2 == 0).then(|| ult(30 + i * 4)),
                sim_nao(contacted && i % 6 == 1),
                WEEKDAYS[i as usize % WEEKDAYS.len()],
            ],
        )?;
    }

    // Six months of settlements so the monthly pivot has something to show.
    for m in 0..6u32 {
        let month_start = months_back(today, m);
        for (k, vendedor) in DEMO_SALESPEOPLE.iter().enumerate() {
            if (m as usize + k) % 4 == 3 {
                continue;
            }
            let baixa = month_start + Duration::days(((k as i64) * 4 + 2).min(27));
            let baixa = if baixa > today { today } else { baixa };
            let valor = 2000.0 + (m as f64) * 310.0 + (k as f64) * 175.0;
            tx.execute(
                "INSERT INTO comissoes (vendedor, numero_da_nota, nome_parceiro, data_da_baixa, valor_da_nota, valor_comissao) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                rusqlite::params![
                    vendedor,
                    8000 + (m as i64) * 10 + k as i64,
                    DEMO_CUSTOMERS[(m as usize + k) % DEMO_CUSTOMERS.len()],
                    baixa.format("%Y-%m-%d").to_string(),
                    valor,
                    (valor * 0.03 * 100.0).round() / 100.0,
                ],
            )?;
        }
    }

    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    fn count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT count(*) FROM {table}"), [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &["estoque", "inadimplencia", "contatos", "comissoes"] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_seed_demo_replaces_rows() {
        let (_dir, conn) = test_db();
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        seed_demo(&conn, today).unwrap();
        let first = count(&conn, "contatos");
        seed_demo(&conn, today).unwrap();
        assert_eq!(count(&conn, "contatos"), first);
        assert_eq!(count(&conn, "estoque"), 18);
        assert!(count(&conn, "comissoes") > 6);
    }

    #[test]
    fn test_seed_demo_settlements_not_in_future() {
        let (_dir, conn) = test_db();
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        seed_demo(&conn, today).unwrap();
        let latest: String = conn
            .query_row("SELECT max(data_da_baixa) FROM comissoes", [], |r| r.get(0))
            .unwrap();
        assert!(latest.as_str() <= "2024-06-01", "got {latest}");
    }
}
