mod tests {
    use myrtio_nu801::index::{led_count, logical_to_physical, physical_to_logical};
    use myrtio_nu801::{ChainIndex, Error, map_channel};

    #[test]
    fn test_map_channel_two_chips() {
        assert_eq!(map_channel(2, 0, 0).unwrap().physical, 5);
        assert_eq!(map_channel(2, 0, 2).unwrap().physical, 3);
        assert_eq!(map_channel(2, 1, 0).unwrap().physical, 2);
        assert_eq!(map_channel(2, 1, 2).unwrap().physical, 0);
    }

    #[test]
    fn test_map_channel_logical_order() {
        assert_eq!(
            map_channel(2, 1, 1),
            Ok(ChainIndex {
                logical: 4,
                physical: 1
            })
        );
        assert_eq!(
            map_channel(1, 0, 0),
            Ok(ChainIndex {
                logical: 0,
                physical: 2
            })
        );
    }

    #[test]
    fn test_map_channel_formula() {
        for chips in 1..=8 {
            for chip in 0..chips {
                for channel in 0..3 {
                    let index = map_channel(chips, chip, channel).unwrap();
                    assert_eq!(index.physical, 3 * (chips - chip - 1) + (2 - channel));
                    assert_eq!(index.logical, 3 * chip + channel);
                }
            }
        }
    }

    #[test]
    fn test_map_channel_is_bijective() {
        for chips in 1..=8 {
            let mut seen = vec![false; led_count(chips)];
            for chip in 0..chips {
                for channel in 0..3 {
                    let physical = map_channel(chips, chip, channel).unwrap().physical;
                    assert!(!seen[physical], "{chips} chips: {physical} mapped twice");
                    seen[physical] = true;
                }
            }
            assert!(seen.iter().all(|&hit| hit));
        }
    }

    #[test]
    fn test_logical_physical_conversion() {
        for chips in 1..=8 {
            for chip in 0..chips {
                for channel in 0..3 {
                    let index = map_channel(chips, chip, channel).unwrap();
                    assert_eq!(logical_to_physical(chips, index.logical), Some(index.physical));
                    assert_eq!(physical_to_logical(chips, index.physical), Some(index.logical));
                }
            }
            assert_eq!(logical_to_physical(chips, led_count(chips)), None);
        }
    }

    #[test]
    fn test_map_channel_out_of_range() {
        assert_eq!(
            map_channel(2, 2, 0),
            Err(Error::ChipOutOfRange {
                chip: 2,
                chip_count: 2
            })
        );
        assert_eq!(
            map_channel(2, 0, 3),
            Err(Error::ChannelOutOfRange { channel: 3 })
        );
    }
}
