/// Like `enumerate`, but yields typed indices (`StopIdx`, `VehicleIdx`, ...) instead of `usize`.
pub trait EnumerateIdx: Iterator + Sized {
    fn enumerate_idx<Idx: From<usize>>(self) -> impl Iterator<Item = (Idx, Self::Item)> {
        self.enumerate().map(|(index, item)| (Idx::from(index), item))
    }
}

impl<I: Iterator> EnumerateIdx for I {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::stop::StopIdx;

    #[test]
    fn test_enumerate_idx() {
        let indexed = ["a", "b"]
            .iter()
            .enumerate_idx::<StopIdx>()
            .collect::<Vec<_>>();

        assert_eq!(indexed, vec![(StopIdx::new(0), &"a"), (StopIdx::new(1), &"b")]);
    }
}
