// ==========================================
// Cargo manifest import (CSV)
// ==========================================

#[path = "test_helpers.rs"]
mod test_helpers;

#[cfg(test)]
mod manifest_import_test {
    use crate::test_helpers::*;
    use its_stock_ledger::api::ApiErrorKind;
    use its_stock_ledger::domain::NewShipment;
    use its_stock_ledger::importer::ImportError;
    use its_stock_ledger::ApiError;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn manifest(lines: &[&str]) -> NamedTempFile {
        let mut file = Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        file
    }

    #[test]
    fn test_import_french_manifest() {
        let (_tmp, state) = create_test_state();
        let file = manifest(&[
            "Produit,Quantité,Unité,Origine",
            "MAIZE,\"1 000,5\",,Argentine",
            "RICE,250,sacs,Thaïlande",
        ]);

        let shipment = state
            .shipment_api
            .import_manifest(NewShipment::vessel("MV-DAKAR"), file.path(), ACTOR)
            .unwrap();

        assert_eq!(shipment.cargo_lines.len(), 2);
        let maize = &shipment.cargo_lines[0];
        assert_eq!(maize.product_reference, "MAIZE");
        assert_eq!(maize.declared_quantity, 1000.5);
        assert_eq!(maize.unit, "tonnes");
        assert_eq!(maize.origin.as_deref(), Some("Argentine"));
        assert_eq!(shipment.cargo_lines[1].unit, "sacs");

        let stored = state.shipment_api.get_cargo_line(&maize.cargo_line_id).unwrap();
        assert_eq!(stored, *maize);
    }

    #[test]
    fn test_bad_row_records_nothing() {
        let (_tmp, state) = create_test_state();
        let file = manifest(&["product,quantity", "MAIZE,100", "RICE,beaucoup"]);

        let err = state
            .shipment_api
            .import_manifest(NewShipment::vessel("MV-DAKAR"), file.path(), ACTOR)
            .unwrap_err();
        assert_eq!(err.kind(), ApiErrorKind::Validation);
        assert!(matches!(
            err,
            ApiError::Import(ImportError::TypeConversionError { row: 3, .. })
        ));
        assert!(state.shipment_api.list_shipments().unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_and_format() {
        let (_tmp, state) = create_test_state();

        let err = state
            .shipment_api
            .import_manifest(NewShipment::vessel("MV-DAKAR"), "no_such_manifest.csv", ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::Import(ImportError::FileNotFound(_))));

        let file = Builder::new().suffix(".txt").tempfile().unwrap();
        let err = state
            .shipment_api
            .import_manifest(NewShipment::vessel("MV-DAKAR"), file.path(), ACTOR)
            .unwrap_err();
        assert!(matches!(err, ApiError::Import(ImportError::UnsupportedFormat(_))));
    }
}
