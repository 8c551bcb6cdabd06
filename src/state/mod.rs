pub mod report_data;
pub mod series;
pub mod theme;
