use crate::pipeline::{LABEL_DOWN, LABEL_UP};
use serde::Serialize;
use std::fmt;

/// Precision / recall / F1 for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Hold-out evaluation of a binary direction classifier
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationReport {
    pub down: ClassMetrics,
    pub up: ClassMetrics,
    pub accuracy: f64,
    pub macro_avg: ClassMetrics,
    pub weighted_avg: ClassMetrics,
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 {
        0.0
    } else {
        num as f64 / den as f64
    }
}

fn class_metrics(y_true: &[u32], y_pred: &[u32], class: u32) -> ClassMetrics {
    let mut tp = 0;
    let mut predicted = 0;
    let mut actual = 0;
    for (t, p) in y_true.iter().zip(y_pred) {
        if *p == class {
            predicted += 1;
        }
        if *t == class {
            actual += 1;
            if *p == class {
                tp += 1;
            }
        }
    }

    let precision = ratio(tp, predicted);
    let recall = ratio(tp, actual);
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };

    ClassMetrics {
        precision,
        recall,
        f1,
        support: actual,
    }
}

impl ClassificationReport {
    /// Compare labels pairwise; extra entries in the longer slice are ignored
    pub fn from_predictions(y_true: &[u32], y_pred: &[u32]) -> Self {
        let n = y_true.len().min(y_pred.len());
        let (y_true, y_pred) = (&y_true[..n], &y_pred[..n]);

        let down = class_metrics(y_true, y_pred, LABEL_DOWN);
        let up = class_metrics(y_true, y_pred, LABEL_UP);
        let correct = y_true.iter().zip(y_pred).filter(|(t, p)| t == p).count();

        let macro_avg = ClassMetrics {
            precision: (down.precision + up.precision) / 2.0,
            recall: (down.recall + up.recall) / 2.0,
            f1: (down.f1 + up.f1) / 2.0,
            support: n,
        };

        let weight = |f: fn(&ClassMetrics) -> f64| {
            if n == 0 {
                0.0
            } else {
                (f(&down) * down.support as f64 + f(&up) * up.support as f64) / n as f64
            }
        };
        let weighted_avg = ClassMetrics {
            precision: weight(|m| m.precision),
            recall: weight(|m| m.recall),
            f1: weight(|m| m.f1),
            support: n,
        };

        Self {
            down,
            up,
            accuracy: ratio(correct, n),
            macro_avg,
            weighted_avg,
        }
    }
}

impl fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9} {:>9}",
            "", "precision", "recall", "f1-score", "support"
        )?;
        for (name, m) in [("0 (down)", &self.down), ("1 (up)", &self.up)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        writeln!(f)?;
        writeln!(
            f,
            "{:>14} {:>9} {:>9} {:>9.2} {:>9}",
            "accuracy", "", "", self.accuracy, self.macro_avg.support
        )?;
        for (name, m) in [("macro avg", &self.macro_avg), ("weighted avg", &self.weighted_avg)] {
            writeln!(
                f,
                "{:>14} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, m.precision, m.recall, m.f1, m.support
            )?;
        }
        Ok(())
    }
}
