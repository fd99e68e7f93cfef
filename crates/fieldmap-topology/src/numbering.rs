use fieldmap_core::FieldItem;
use serde::{Deserialize, Serialize};

use crate::topology::{FieldTopology, RowDirection};

/// Item with its position in the serpentine walk of the field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumberedItem {
    pub row: u32,
    /// 1-based, running over the whole field.
    pub number_within_field: usize,
    /// 1-based, restarting on each row.
    pub number_within_row: usize,
    pub item: FieldItem,
}

/// Number every boundary and plant in serpentine order.
///
/// Rows are walked by ascending number; odd rows are listed in the field
/// direction and even rows against it.
pub fn number_serpentine(topology: &FieldTopology) -> Vec<NumberedItem> {
    let mut out = Vec::new();

    for row_id in topology.rows_by_number() {
        let row = topology.row(row_id);
        let mut row_items: Vec<FieldItem> = Vec::new();
        for (i, &sid) in row.segments.iter().enumerate() {
            let seg = topology.segment(sid);
            row_items.push(seg.start.clone());
            row_items.extend(seg.plants.iter().cloned().map(FieldItem::Plant));
            if i + 1 == row.segments.len() {
                row_items.push(seg.end.clone());
            }
        }

        // Segments follow the planting direction; bring them back to the
        // field direction first.
        if row.direction == RowDirection::Back {
            row_items.reverse();
        }
        if row.number % 2 == 0 {
            row_items.reverse();
        }

        for (i, item) in row_items.into_iter().enumerate() {
            out.push(NumberedItem {
                row: row.number,
                number_within_field: out.len() + 1,
                number_within_row: i + 1,
                item,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::{PlantGroupSegment, Row, RowId};
    use fieldmap_core::{Code, CodeKind, Plant};
    use nalgebra::Point3;

    fn code(name: &str, x: f64, y: f64) -> Code {
        Code {
            kind: CodeKind::Row,
            name: name.into(),
            position: Point3::new(x, y, 0.0),
            item: None,
            row: None,
        }
    }

    fn add_row(t: &mut FieldTopology, number: u32, direction: RowDirection) {
        let x = number as f64;
        let start = code(&format!("{number}s"), x, 0.0);
        let end = code(&format!("{number}e"), x, 2.0);
        t.rows.push(Row {
            number,
            pass: 1,
            start: start.clone(),
            end: end.clone(),
            direction,
            segments: Vec::new(),
        });
        let (a, b) = match direction {
            RowDirection::Up => (start, end),
            RowDirection::Back => (end, start),
        };
        let mut seg = PlantGroupSegment::new(RowId(t.rows.len() - 1), a, b);
        seg.plants.push(Plant::created(Point3::new(x, 1.0, 0.0)));
        t.push_segment(seg);
    }

    fn name(n: &NumberedItem) -> String {
        match &n.item {
            FieldItem::Code(c) => c.name.clone(),
            FieldItem::Plant(_) => "plant".into(),
        }
    }

    #[test]
    fn serpentine_alternates_row_order() {
        let mut t = FieldTopology::default();
        // Inserted out of order on purpose.
        add_row(&mut t, 2, RowDirection::Up);
        add_row(&mut t, 1, RowDirection::Up);
        add_row(&mut t, 3, RowDirection::Back);

        let numbered = number_serpentine(&t);
        let names: Vec<String> = numbered.iter().map(name).collect();
        assert_eq!(
            names,
            vec!["1s", "plant", "1e", "2e", "plant", "2s", "3s", "plant", "3e"]
        );
        let field: Vec<usize> = numbered.iter().map(|n| n.number_within_field).collect();
        assert_eq!(field, (1..=9).collect::<Vec<_>>());
        assert_eq!(numbered[3].number_within_row, 1);
        assert_eq!(numbered[8].number_within_row, 3);
        assert_eq!(numbered[8].row, 3);
    }
}
