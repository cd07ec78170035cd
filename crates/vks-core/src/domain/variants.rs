//! Closed type families persisted by display name.
//!
//! Renaming a display name here is a storage migration: rows written with
//! the old name stop resolving and surface as `NotFound` on read.

use crate::type_family;

type_family! {
    /// Commercial kind of an order.
    pub enum OrderType: "OrderType" {
        Standard => "Standard",
        Express => "Express",
        Return => "Return",
    }
}

type_family! {
    /// Workflow step recorded in order and order item history.
    pub enum OrderStepType: "OrderStepType" {
        Created => "Created",
        Confirmed => "Confirmed",
        InProduction => "InProduction",
        QualityControl => "QualityControl",
        Completed => "Completed",
        Shipped => "Shipped",
        Cancelled => "Cancelled",
    }
}

type_family! {
    pub enum ProductCategoryType: "ProductCategoryType" {
        Product => "Product",
        Subproduct => "Subproduct",
        Accessory => "Accessory",
        Service => "Service",
    }
}

type_family! {
    /// Unit a product amount is measured in.
    pub enum AmountUnitType: "AmountUnitType" {
        Piece => "Piece",
        Meter => "Meter",
        SquareMeter => "SquareMeter",
        Kilogram => "Kilogram",
        Liter => "Liter",
    }
}

type_family! {
    /// Input control used to pick a product option.
    pub enum ControlType: "ControlType" {
        Checkbox => "Checkbox",
        Select => "Select",
        Text => "Text",
        Number => "Number",
    }
}

type_family! {
    /// Where a file's content lives.
    pub enum StorageType: "StorageType" {
        Database => "Database",
        FileSystem => "FileSystem",
    }
}

type_family! {
    /// Step recorded in stock item history.
    pub enum StockItemStepType: "StockItemStepType" {
        Received => "Received",
        Stored => "Stored",
        Reserved => "Reserved",
        Issued => "Issued",
        Scrapped => "Scrapped",
    }
}

type_family! {
    pub enum ProductFileType: "ProductFileType" {
        Image => "Image",
        Document => "Document",
        Drawing => "Drawing",
    }
}
