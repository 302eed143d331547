pub(crate) mod any_date;
pub(crate) mod day_matrix;
pub(crate) mod reading;
pub(crate) mod sensor_type;
pub(crate) mod station;
pub(crate) mod training_example;
