//! Statistical tests of presence proportions between cohorts.


pub use proportion::{
    ChiSquaredOutcome, ContingencyTable, ContinuityCorrection, PairwiseResults,
    PearsonChiSquared, ProportionTest, ProportionTestResult, ProportionTester, TestOutcome,
};
