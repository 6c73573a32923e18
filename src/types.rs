/// Stable identifier of one example in the global pool.
/// Example: `31337` (index into the training set)
pub type ExampleId = usize;
/// Informativeness score produced by an external model (higher is more valuable).
/// Example: `0.8312` (predicted loss)
pub type Score = f64;
/// Zero-based acquisition round counter; round `0` seeds the labeled set.
pub type RoundIndex = usize;
/// Free-form diagnostic text attached to integrity errors.
/// Example: `identifier 17 drawn 2 times`
pub type Details = String;
