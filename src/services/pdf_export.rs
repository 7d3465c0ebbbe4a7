//! Printable single-record summary.

use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point,
};

use crate::error::{AppError, AppResult};
use crate::models::metrics::BonusTier;
use crate::models::production::ProductionRecord;
use crate::models::report::{MISSING_ENTITY, NO_CATEGORY_BUCKET};
use crate::utils::dates::to_display;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 18.0;
const ROW_HEIGHT: f32 = 7.0;
const TABLE_COLUMNS: [(&str, f32); 4] = [
    ("Producto", MARGIN),
    ("Cantidad", 105.0),
    ("Meta", 135.0),
    ("% Cumplimiento", 160.0),
];

#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationLine {
    pub product: String,
    pub quantity: f64,
    pub target: Option<f64>,
    pub percentage: f64,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

struct Cursor {
    layer: PdfLayerReference,
    y: f32,
    pages: usize,
}

impl Cursor {
    fn text(&self, value: &str, size: f32, x: f32, font: &IndirectFontRef) {
        self.layer.use_text(value, size, Mm(x), Mm(self.y), font);
    }

    fn rule(&self, y: f32) {
        self.layer.set_outline_thickness(0.4);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), Mm(y)), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), Mm(y)), false),
            ],
            is_closed: false,
        });
    }
}

pub fn render_registration(
    record: &ProductionRecord,
    lines: &[RegistrationLine],
) -> AppResult<Vec<u8>> {
    let title = format!("Registro de producción #{}", record.id);
    let (doc, page, layer) =
        PdfDocument::new(&title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Registro");
    let fonts = Fonts {
        regular: doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(pdf_error)?,
        bold: doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?,
    };

    let mut cursor = Cursor {
        layer: doc.get_page(page).get_layer(layer),
        y: PAGE_HEIGHT - MARGIN,
        pages: 1,
    };

    cursor.text(&title, 16.0, MARGIN, &fonts.bold);
    cursor.y -= 6.0;
    cursor.rule(cursor.y);
    cursor.y -= 9.0;

    for (label, value) in header_fields(record) {
        cursor.text(&format!("{label}:"), 10.0, MARGIN, &fonts.bold);
        cursor.text(&value, 10.0, MARGIN + 32.0, &fonts.regular);
        cursor.y -= ROW_HEIGHT;
    }

    cursor.y -= 4.0;
    table_header(&cursor, &fonts);
    cursor.y -= ROW_HEIGHT;

    for line in lines {
        if cursor.y < MARGIN + ROW_HEIGHT * 3.0 {
            next_page(&doc, &mut cursor);
            table_header(&cursor, &fonts);
            cursor.y -= ROW_HEIGHT;
        }
        let target = line
            .target
            .map(format_number)
            .unwrap_or_else(|| "Sin meta".to_string());
        cursor.text(&line.product, 10.0, TABLE_COLUMNS[0].1, &fonts.regular);
        cursor.text(&format_number(line.quantity), 10.0, TABLE_COLUMNS[1].1, &fonts.regular);
        cursor.text(&target, 10.0, TABLE_COLUMNS[2].1, &fonts.regular);
        cursor.text(
            &format!("{:.2}%", line.percentage),
            10.0,
            TABLE_COLUMNS[3].1,
            &fonts.regular,
        );
        cursor.y -= ROW_HEIGHT;
    }

    if lines.is_empty() {
        cursor.text("Sin productos registrados", 10.0, MARGIN, &fonts.regular);
        cursor.y -= ROW_HEIGHT;
    }

    cursor.rule(cursor.y + ROW_HEIGHT - 2.0);
    let total: f64 = lines.iter().map(|line| line.percentage).sum();
    cursor.y -= 2.0;
    cursor.text(
        &format!("Cumplimiento del turno: {total:.2}%"),
        11.0,
        MARGIN,
        &fonts.bold,
    );
    if !record.is_assistant {
        cursor.text(
            &format!("Nivel: {}", BonusTier::classify(total).label()),
            11.0,
            TABLE_COLUMNS[2].1,
            &fonts.bold,
        );
    }

    tracing::debug!(target: "app::report", record_id = record.id, pages = cursor.pages, "registration pdf rendered");
    doc.save_to_bytes().map_err(pdf_error)
}

fn header_fields(record: &ProductionRecord) -> Vec<(&'static str, String)> {
    let machine = record.machine.as_ref();
    let assistants = record
        .assistants
        .iter()
        .map(|assistant| assistant.full_name.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let mut fields = vec![
        ("Fecha", to_display(record.date)),
        ("Turno", record.shift.clone()),
        (
            "Máquina",
            machine
                .map(|machine| machine.name.clone())
                .unwrap_or_else(|| MISSING_ENTITY.to_string()),
        ),
        (
            "Categoría",
            record.category().unwrap_or(NO_CATEGORY_BUCKET).to_string(),
        ),
        (
            "Operario",
            record
                .operator
                .as_ref()
                .map(|operator| operator.full_name.clone())
                .unwrap_or_else(|| MISSING_ENTITY.to_string()),
        ),
        (
            "Rol",
            if record.is_assistant { "Ayudante" } else { "Principal" }.to_string(),
        ),
    ];
    if !assistants.is_empty() {
        fields.push(("Ayudantes", assistants));
    }
    if let Some(notes) = &record.notes {
        fields.push(("Notas", notes.clone()));
    }
    fields
}

fn table_header(cursor: &Cursor, fonts: &Fonts) {
    for (label, x) in TABLE_COLUMNS {
        cursor.text(label, 10.0, x, &fonts.bold);
    }
    cursor.rule(cursor.y - 2.0);
}

fn next_page(doc: &PdfDocumentReference, cursor: &mut Cursor) {
    let (page, layer) = doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), "Registro");
    cursor.layer = doc.get_page(page).get_layer(layer);
    cursor.y = PAGE_HEIGHT - MARGIN;
    cursor.pages += 1;
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

fn pdf_error(err: printpdf::Error) -> AppError {
    AppError::export("pdf", format!("{err:?}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::machine::MachineRecord;
    use crate::models::operator::OperatorRef;
    use chrono::NaiveDate;

    fn record() -> ProductionRecord {
        ProductionRecord {
            id: 7,
            date: NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(),
            shift: "10 horas".into(),
            machine: Some(MachineRecord {
                id: 1,
                name: "Inyectora 1".into(),
                category: Some("Inyeccion".into()),
            }),
            operator: Some(OperatorRef {
                id: 1,
                full_name: "Juan Perez".into(),
            }),
            is_assistant: false,
            assistants: vec![OperatorRef {
                id: 2,
                full_name: "Ana Gomez".into(),
            }],
            details: Vec::new(),
            notes: Some("Cambio de molde".into()),
            created_at: "2024-03-04T18:00:00Z".into(),
        }
    }

    #[test]
    fn renders_a_pdf_document() {
        let lines = vec![
            RegistrationLine {
                product: "Esfera 8cm".into(),
                quantity: 300.0,
                target: Some(250.0),
                percentage: 120.0,
            },
            RegistrationLine {
                product: "Estrella".into(),
                quantity: 12.5,
                target: None,
                percentage: 0.0,
            },
        ];
        let bytes = render_registration(&record(), &lines).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn long_records_spill_onto_more_pages() {
        let lines: Vec<RegistrationLine> = (0..80)
            .map(|index| RegistrationLine {
                product: format!("Producto {index}"),
                quantity: 10.0,
                target: Some(100.0),
                percentage: 10.0,
            })
            .collect();
        let bytes = render_registration(&record(), &lines).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn header_includes_optional_fields_only_when_present() {
        let mut bare = record();
        bare.assistants.clear();
        bare.notes = None;
        let labels: Vec<&str> = header_fields(&bare).into_iter().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["Fecha", "Turno", "Máquina", "Categoría", "Operario", "Rol"]);
        assert_eq!(header_fields(&record()).len(), 8);
    }

    #[test]
    fn numbers_drop_trailing_zero_decimals() {
        assert_eq!(format_number(250.0), "250");
        assert_eq!(format_number(12.5), "12.50");
    }
}
