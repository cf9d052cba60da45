#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum GridError {
    #[error("no quadrilateral tag outline found")]
    NoOutline,

    #[error("tag outline is empty after cropping")]
    EmptyRoi,

    #[error("no strategy produced a grid size in {min}..={max}")]
    NoPlausibleSize { min: usize, max: usize },
}
