//! Row-strobed GPIO matrix scanning.
//!
//! Rows are push-pull outputs parked high; columns are pull-up inputs. A
//! scan drives one row low at a time and reads every column; a low column
//! means the switch at that intersection is closed. Scan order is row-major
//! and deterministic, so edge detection downstream is stable across ticks.

use embedded_hal::digital::v2::{InputPin, OutputPin};

/// A keyboard matrix: `R` driven rows, `C` read columns.
pub struct Matrix<O, I, const R: usize, const C: usize>
where
    O: OutputPin,
    I: InputPin,
{
    rows: [O; R],
    cols: [I; C],
}

impl<O, I, const R: usize, const C: usize> Matrix<O, I, R, C>
where
    O: OutputPin,
    I: InputPin,
{
    /// Take ownership of the pins and park all rows high (inactive).
    pub fn new<E>(rows: [O; R], cols: [I; C]) -> Result<Self, E>
    where
        O: OutputPin<Error = E>,
        I: InputPin<Error = E>,
    {
        let mut matrix = Matrix { rows, cols };
        for row in matrix.rows.iter_mut() {
            row.set_high()?;
        }
        Ok(matrix)
    }

    /// One full scan, `true` = key down.
    pub fn scan<E>(&mut self) -> Result<[[bool; C]; R], E>
    where
        O: OutputPin<Error = E>,
        I: InputPin<Error = E>,
    {
        self.scan_with_delay(|| ())
    }

    /// Like [`scan`](Matrix::scan), calling `settle` after driving each row
    /// so slow wiring can be given time before the columns are read.
    pub fn scan_with_delay<E>(&mut self, mut settle: impl FnMut()) -> Result<[[bool; C]; R], E>
    where
        O: OutputPin<Error = E>,
        I: InputPin<Error = E>,
    {
        let mut out = [[false; C]; R];
        for (r, row) in self.rows.iter_mut().enumerate() {
            row.set_low()?;
            settle();
            for (c, col) in self.cols.iter().enumerate() {
                out[r][c] = col.is_low()?;
            }
            row.set_high()?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::vec::Vec;

    /// Which row is currently driven low, shared between the fake pins.
    type Driven = Rc<RefCell<Option<usize>>>;

    struct FakeRow {
        index: usize,
        driven: Driven,
        log: Rc<RefCell<Vec<(usize, bool)>>>,
    }

    impl OutputPin for FakeRow {
        type Error = core::convert::Infallible;
        fn set_low(&mut self) -> Result<(), Self::Error> {
            *self.driven.borrow_mut() = Some(self.index);
            self.log.borrow_mut().push((self.index, false));
            Ok(())
        }
        fn set_high(&mut self) -> Result<(), Self::Error> {
            if *self.driven.borrow() == Some(self.index) {
                *self.driven.borrow_mut() = None;
            }
            self.log.borrow_mut().push((self.index, true));
            Ok(())
        }
    }

    struct FakeCol {
        index: usize,
        driven: Driven,
        closed: Rc<RefCell<Vec<(usize, usize)>>>,
    }

    impl InputPin for FakeCol {
        type Error = core::convert::Infallible;
        fn is_high(&self) -> Result<bool, Self::Error> {
            Ok(!self.is_low()?)
        }
        fn is_low(&self) -> Result<bool, Self::Error> {
            // The line reads low when the driven row connects to us
            // through a closed switch.
            let driven = *self.driven.borrow();
            Ok(match driven {
                Some(r) => self.closed.borrow().contains(&(r, self.index)),
                None => false,
            })
        }
    }

    fn fixture(
        closed: &[(usize, usize)],
    ) -> (
        Matrix<FakeRow, FakeCol, 4, 6>,
        Rc<RefCell<Vec<(usize, bool)>>>,
    ) {
        let driven: Driven = Rc::new(RefCell::new(None));
        let log = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(RefCell::new(closed.to_vec()));
        let mk_row = |index| FakeRow {
            index,
            driven: driven.clone(),
            log: log.clone(),
        };
        let mk_col = |index| FakeCol {
            index,
            driven: driven.clone(),
            closed: closed.clone(),
        };
        let rows = [mk_row(0), mk_row(1), mk_row(2), mk_row(3)];
        let cols = [
            mk_col(0),
            mk_col(1),
            mk_col(2),
            mk_col(3),
            mk_col(4),
            mk_col(5),
        ];
        let matrix = match Matrix::new(rows, cols) {
            Ok(m) => m,
            Err(e) => match e {},
        };
        log.borrow_mut().clear();
        (matrix, log)
    }

    #[test]
    fn reads_closed_switches_at_their_intersections() {
        let (mut matrix, _log) = fixture(&[(0, 0), (2, 5), (3, 1)]);
        let scan = match matrix.scan() {
            Ok(s) => s,
            Err(e) => match e {},
        };
        let mut expected = [[false; 6]; 4];
        expected[0][0] = true;
        expected[2][5] = true;
        expected[3][1] = true;
        assert_eq!(scan, expected);
    }

    #[test]
    fn strobes_rows_in_order_and_restores_them() {
        let (mut matrix, log) = fixture(&[]);
        let _ = matrix.scan();
        assert_eq!(
            &*log.borrow(),
            &[
                (0, false),
                (0, true),
                (1, false),
                (1, true),
                (2, false),
                (2, true),
                (3, false),
                (3, true),
            ]
        );
    }
}
