//! Schema Descriptor
//!
//! Static description of the sales/manufacturing/warehouse tables that the
//! generator is allowed to query. Rendered once into the generation prompt.

use std::fmt::Write;

/// One column with its business meaning and known coded values.
#[derive(Debug, Clone, Copy)]
pub struct ColumnDescriptor {
    pub name: &'static str,
    pub comment: &'static str,
    /// `(code, meaning)` pairs for columns with a fixed value set.
    pub values: &'static [(&'static str, &'static str)],
}

#[derive(Debug, Clone, Copy)]
pub struct TableDescriptor {
    pub name: &'static str,
    pub columns: &'static [ColumnDescriptor],
}

/// Equality join between two tables on a shared column.
#[derive(Debug, Clone, Copy)]
pub struct JoinKey {
    pub left: &'static str,
    pub right: &'static str,
    pub column: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct SchemaDescriptor {
    pub tables: &'static [TableDescriptor],
    pub joins: &'static [JoinKey],
}

const fn col(name: &'static str, comment: &'static str) -> ColumnDescriptor {
    ColumnDescriptor {
        name,
        comment,
        values: &[],
    }
}

const fn coded(
    name: &'static str,
    comment: &'static str,
    values: &'static [(&'static str, &'static str)],
) -> ColumnDescriptor {
    ColumnDescriptor {
        name,
        comment,
        values,
    }
}

const SALES_LOGISTICS: TableDescriptor = TableDescriptor {
    name: "SALES_LOGISTICS",
    columns: &[
        col("SalesOrder", "Sales Order Number"),
        coded(
            "SalesType",
            "Abbreviation for the type of Sales Order",
            &[("ZODM", "domestic"), ("ZOEX", "international")],
        ),
        coded(
            "OverallStatus",
            "Overall Status of the Sales Order",
            &[("A", "Completed"), ("B", "Incomplete")],
        ),
        col("SalesDate2", "Sales Order Date as YYYY-MM-DD (e.g., 2023-12-31)"),
        coded(
            "Plant",
            "Plant code",
            &[("1000", "RC"), ("1100", "Food"), ("2000", "RMP")],
        ),
        col("PuchaseOrder", "Purchase Order Number, PO Number"),
        col("LineItemNo", "Sequence of the item within the Sales Order"),
        col("OrderQty", "Order Quantity"),
        col("DeliveryQty", "Delivery Quantity"),
        col("OpenQty", "Outstanding balance"),
        coded(
            "SalesUnit",
            "Sales Unit of Measure",
            &[("PCS", "pieces"), ("SET", "set"), ("SH", "sheet")],
        ),
        col(
            "RequestedDlDate2",
            "Date the customer wants to receive the item as YYYY-MM-DD",
        ),
        col("NameSoldtoParty", "Name of the Sold-to Party (customer name)"),
        col("NameEmployee", "Name of the Employee who created the Sales Order"),
        col("PurchaseOrderDate2", "Date of the Purchase Order as YYYY-MM-DD"),
        coded(
            "Currency",
            "Currency",
            &[("THB", "Thai Baht"), ("USD", "US Dollar")],
        ),
        coded(
            "DeliveryStatus",
            "Delivery or shipping status",
            &[("A", "Completed"), ("B", "not yet sent")],
        ),
        col("ShiptoParty", "Shipping location (customer code)"),
        col(
            "uploaded",
            "Date the record was uploaded to the database as YYYY-MM-DD",
        ),
    ],
};

const MATERIAL_MANUFACTURING: TableDescriptor = TableDescriptor {
    name: "MATERIAL_MANUFACTURING",
    columns: &[
        col("SalesOrder", "Sales Order Number"),
        coded(
            "MG2",
            "Product type",
            &[
                ("3PC", "3 piece can"),
                ("END", "normal cap or shell cap"),
                ("EOE", "easy to open cap"),
                ("POE", "quick peel cap"),
                ("EOS", "spoon cap"),
                ("2PC", "2 piece can"),
                ("SOT", "Stay On Tab"),
            ],
        ),
        col("Material1", "Material Number code"),
        col("MaterialDes", "Material Description or name of material"),
        coded(
            "Uom",
            "Unit of Measure code",
            &[
                ("PCS", "Piece"),
                ("BLK", "Blank"),
                ("SET", "Set"),
                ("ST", "Strip"),
                ("SH", "Shearline Sheet"),
                ("SHT", "Sheet of color printing coating"),
            ],
        ),
        coded(
            "MatGroup1",
            "Material Group, type of steel",
            &[("A", "Aluminum"), ("L", "Laminate"), ("S", "Steel")],
        ),
        col("MatGroup3", "Material Group 3, can size or lid size"),
        coded(
            "MatGroup4",
            "Material Group 4",
            &[
                ("1", "Color Printing"),
                ("2", "No Color Printing"),
                ("999", "Other Jobs"),
                ("OEM", "Contract Jobs"),
                ("Z01", "Claim Jobs"),
            ],
        ),
        col("PricingUnit", "Price per unit"),
        col("NetPrice", "Net Price"),
    ],
};

const WAREHOUSE_STOCK: TableDescriptor = TableDescriptor {
    name: "WAREHOUSE_STOCK",
    columns: &[
        col("SalesOrder", "Sales Order Number"),
        col("Sloc", "Storage Location"),
        col("GoodRecipient", "Good Recipient Number"),
        col("Batch", "Batch Number"),
        col("UnrestrictQty", "Unrestricted Quantity"),
        col("InspQty", "Balance waiting for QC inspection"),
        col("BlockQty", "Balance stuck in block"),
        col(
            "UnrestrictValue",
            "Balance value in Unrestricted (UR balance value, available balance value)",
        ),
        col("InspValue", "QC inspection balance value"),
        col("BlockValue", "Block balance value, unsold balance value"),
        col("StockWH", "Stock Warehouse"),
        col("StockWIP", "Stock Work In Progress"),
        col("StockHold", "Stock on Hold"),
        col("StockQI", "Stock Quality Inspection"),
        col("StockBlock", "Stock Block"),
    ],
};

/// The schema every request is answered against.
pub static SALES_SCHEMA: SchemaDescriptor = SchemaDescriptor {
    tables: &[SALES_LOGISTICS, MATERIAL_MANUFACTURING, WAREHOUSE_STOCK],
    joins: &[
        JoinKey {
            left: "SALES_LOGISTICS",
            right: "WAREHOUSE_STOCK",
            column: "SalesOrder",
        },
        JoinKey {
            left: "SALES_LOGISTICS",
            right: "MATERIAL_MANUFACTURING",
            column: "SalesOrder",
        },
    ],
};

impl SchemaDescriptor {
    /// Render as annotated `TABLE name (...)` blocks.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (idx, table) in self.tables.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            let _ = writeln!(out, "TABLE {} (", table.name);
            for (col_idx, column) in table.columns.iter().enumerate() {
                let sep = if col_idx + 1 == table.columns.len() { "" } else { "," };
                let _ = write!(out, "    {}{} -- {}", column.name, sep, column.comment);
                if !column.values.is_empty() {
                    let hints: Vec<String> = column
                        .values
                        .iter()
                        .map(|(code, meaning)| format!("'{}': {}", code, meaning))
                        .collect();
                    let _ = write!(out, " (e.g., {})", hints.join(", "));
                }
                out.push('\n');
            }
            out.push_str(");\n");
        }
        out
    }

    /// Join conditions formatted as `A.col = B.col`.
    pub fn join_conditions(&self) -> Vec<String> {
        self.joins
            .iter()
            .map(|j| format!("{}.{} = {}.{}", j.left, j.column, j.right, j.column))
            .collect()
    }
}
