use derive_setters::Setters;

/// User facing strings of the table. Every field can be overridden on its own.
#[derive(Debug, Clone, PartialEq, Setters)]
#[setters(into)]
pub struct TableTexts {
    pub search_placeholder: String,
    pub rows_per_page: String,
    pub no_results: String,
    pub of: String,
    pub selected: String,
    pub actions: String,
}

impl Default for TableTexts {
    fn default() -> Self {
        Self {
            search_placeholder: "Search...".into(),
            rows_per_page: "Rows per page".into(),
            no_results: "No results".into(),
            of: "of".into(),
            selected: "selected".into(),
            actions: "Actions".into(),
        }
    }
}

impl TableTexts {
    pub fn spanish() -> Self {
        Self {
            search_placeholder: "Buscar...".into(),
            rows_per_page: "Filas por página".into(),
            no_results: "Sin resultados".into(),
            of: "de".into(),
            selected: "seleccionados".into(),
            actions: "Acciones".into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_single_field() {
        let texts = TableTexts::spanish().no_results("Nada");
        assert_eq!(texts.no_results, "Nada");
        assert_eq!(texts.of, "de");
    }
}
