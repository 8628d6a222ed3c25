pub mod a001_equipment;
pub mod a002_equipment_family;
pub mod u501_import_equipment;
