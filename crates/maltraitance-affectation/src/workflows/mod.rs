pub mod affectation;
