use crate::error::{PainelError, Result};
use crate::export::{ExportFile, ExportFormat};
use crate::models::Identity;
use crate::reports::{Controls, RenderedReport, ReportDefinition, ReportKind};

/// The reports one identity may open, in registration order.
#[derive(Debug, Clone)]
pub struct ReportRegistry {
    identity: Identity,
    reports: Vec<ReportDefinition>,
}

fn is_allowed(identity: &Identity, allowed: Option<&[&str]>) -> bool {
    match allowed {
        None => true,
        Some(list) => list
            .iter()
            .any(|entry| *entry == identity.role.label() || *entry == identity.name),
    }
}

impl ReportRegistry {
    pub fn new(identity: &Identity) -> Self {
        Self {
            identity: identity.clone(),
            reports: Vec::new(),
        }
    }

    /// Add `report` unless an allow-list excludes this identity. Returns whether it
    /// was registered. Re-registering a kind replaces the earlier definition in place.
    pub fn register(&mut self, report: ReportDefinition, allowed: Option<&[&str]>) -> bool {
        if !is_allowed(&self.identity, allowed) {
            tracing::debug!(
                report = report.kind().key(),
                user = %self.identity.name,
                "report not allowed"
            );
            return false;
        }
        tracing::debug!(report = report.kind().key(), "report registered");
        match self.reports.iter_mut().find(|r| r.kind() == report.kind()) {
            Some(existing) => *existing = report,
            None => self.reports.push(report),
        }
        true
    }

    pub fn reports(&self) -> &[ReportDefinition] {
        &self.reports
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    /// Look a report up by title or key. Unknown and forbidden names produce the same
    /// error, so the message never reveals which reports exist.
    pub fn get(&self, name: &str) -> Result<&ReportDefinition> {
        self.reports
            .iter()
            .find(|r| r.kind().matches_name(name))
            .ok_or_else(|| PainelError::ReportUnavailable(name.trim().to_string()))
    }

    pub fn get_kind(&self, kind: ReportKind) -> Option<&ReportDefinition> {
        self.reports.iter().find(|r| r.kind() == kind)
    }

    pub fn render(&self, name: &str, controls: &Controls) -> Result<RenderedReport> {
        self.get(name)?.render(controls)
    }

    pub fn export(
        &self,
        name: &str,
        controls: &Controls,
        format: ExportFormat,
    ) -> Result<ExportFile> {
        self.get(name)?.export(controls, format)
    }

    /// Render every report with default controls. One report failing does not stop
    /// the others; its error is returned in its slot.
    pub fn render_all(&self) -> Vec<(ReportKind, Result<RenderedReport>)> {
        self.reports
            .iter()
            .map(|r| {
                let result = r.render(&Controls::default());
                if let Err(e) = &result {
                    tracing::warn!(report = r.kind().key(), error = %e, "report failed to render");
                }
                (r.kind(), result)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::NaiveDate;

    use super::*;
    use crate::models::MANAGEMENT;
    use crate::table::{Table, Value};
    use crate::warehouse::DatasetKind;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn empty(kind: ReportKind) -> Arc<Table> {
        let ds = kind.dataset();
        Arc::new(Table::with_columns(ds.key(), ds.columns()))
    }

    fn titles(registry: &ReportRegistry) -> Vec<&'static str> {
        registry.reports().iter().map(|r| r.title()).collect()
    }

    fn registry_for(who: &Identity) -> ReportRegistry {
        let mut registry = ReportRegistry::new(who);
        for kind in crate::reports::ALL_REPORTS {
            registry.register(
                ReportDefinition::new(*kind, empty(*kind), who, today()),
                kind.allowed(),
            );
        }
        registry
    }

    #[test]
    fn test_allow_list_filters_salesperson() {
        let registry = registry_for(&Identity::salesperson("Ana"));
        assert!(!titles(&registry).contains(&"Resumo de Contatos"));
        assert_eq!(titles(&registry).len(), 5);

        let registry = registry_for(&Identity::management());
        assert_eq!(
            titles(&registry),
            vec![
                "Cotações com falta de Estoque",
                "Relatório de Inadimplência",
                "Relatório de Contatos",
                "Resumo de Contatos",
                "Relatório de Comissões",
                "Comissões por Mês",
            ]
        );
    }

    #[test]
    fn test_allow_list_accepts_display_name() {
        let who = Identity::salesperson("Carla");
        let mut registry = ReportRegistry::new(&who);
        let def = ReportDefinition::new(
            ReportKind::ResumoContatos,
            empty(ReportKind::ResumoContatos),
            &who,
            today(),
        );
        assert!(registry.register(def, Some(&[MANAGEMENT, "Carla"])));
    }

    #[test]
    fn test_unknown_and_forbidden_look_the_same() {
        let registry = registry_for(&Identity::salesperson("Ana"));
        let unknown = registry.render("Relatório Secreto", &Controls::default()).unwrap_err();
        let forbidden = registry.render("Resumo de Contatos", &Controls::default()).unwrap_err();
        assert!(matches!(unknown, PainelError::ReportUnavailable(_)));
        assert!(matches!(forbidden, PainelError::ReportUnavailable(_)));
        assert_eq!(
            unknown.to_string().replace("Relatório Secreto", "X"),
            forbidden.to_string().replace("Resumo de Contatos", "X")
        );
    }

    #[test]
    fn test_render_by_title_or_key() {
        let registry = registry_for(&Identity::management());
        let a = registry.render("Relatório de Contatos", &Controls::default()).unwrap();
        let b = registry.render("contatos", &Controls::default()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_failing_report_is_isolated() {
        let who = Identity::management();
        let mut registry = registry_for(&who);
        // An inventory table with a garbage date breaks only that report.
        let mut bad = Table::with_columns("estoque", DatasetKind::Estoque.columns());
        let mut row = vec![Value::Null; DatasetKind::Estoque.columns().len()];
        row[2] = Value::text("não é data");
        bad.push_row(row).unwrap();
        registry.register(
            ReportDefinition::new(ReportKind::Estoque, Arc::new(bad), &who, today()),
            None,
        );

        let results = registry.render_all();
        assert_eq!(results.len(), 6);
        assert_eq!(results[0].0, ReportKind::Estoque);
        assert!(results[0].1.is_err());
        assert!(results[1..].iter().all(|(_, r)| r.is_ok()));
        assert!(registry.export("inadimplencia", &Controls::default(), ExportFormat::Csv).is_ok());
    }
}
