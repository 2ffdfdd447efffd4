//! End-to-end encode/decode round trips

use std::path::Path;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use yenc_codec::{
    ContentBuffer, ContentKind, Decoder, Encoder, EncoderOptions, PartAssembler, Result,
};

fn binary(data: &[u8], name: &str, dir: &Path) -> ContentBuffer {
    let mut content = ContentBuffer::new(ContentKind::Binary, dir);
    content.filename = Some(name.to_string());
    content.append(data).unwrap();
    content.finalize();
    content
}

#[test]
fn single_part_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let source = binary(b"Hello, yEnc!\n", "hello.txt", dir.path());
    let encoder = Encoder::with_options(
        dir.path(),
        EncoderOptions {
            line_length: 16,
            ..Default::default()
        },
    )
    .unwrap();

    let parts: Vec<_> = encoder
        .encode_buffer(&source)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    assert_eq!(parts.len(), 1, "a single-part input yields exactly one part");

    let decoded = Decoder::new(dir.path())
        .decode_bytes(&parts[0].getvalue().unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(decoded.getvalue().unwrap(), b"Hello, yEnc!\n");
    assert!(decoded.is_valid());
    assert_eq!(decoded.crc32(), 0x6abc7d29);
    assert_eq!(decoded.declared_crc32, Some(0x6abc7d29));
    assert_eq!(decoded.filename.as_deref(), Some("hello.txt"));
}

#[test]
fn all_byte_values_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let payload: Vec<u8> = (0u8..=255).collect();
    let source = binary(&payload, "allbytes.bin", dir.path());

    let encoded = Encoder::new(dir.path()).encode_single(&source).unwrap();
    let decoded = Decoder::new(dir.path())
        .decode_bytes(&encoded.getvalue().unwrap())
        .unwrap()
        .unwrap();

    assert_eq!(decoded.getvalue().unwrap(), payload);
    assert!(decoded.is_valid());
    assert_eq!(decoded.crc32(), source.crc32());
    assert_eq!(decoded.md5(), source.md5());
}

#[test]
fn random_payloads_across_configurations() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let cases: &[(usize, usize, Option<u64>)] = &[
        (1, 16, None),
        (1000, 16, Some(333)),
        (4096, 128, Some(1024)),
        (10_000, 61, Some(977)),
        (65_536, 997, Some(16_384)),
        (300, 128, Some(1024)), // part_size larger than the input
    ];

    for &(len, line_length, part_size) in cases {
        let mut payload = vec![0u8; len];
        rng.fill_bytes(&mut payload);
        let source = binary(&payload, "random.bin", dir.path());
        let encoder = Encoder::with_options(
            dir.path(),
            EncoderOptions {
                line_length,
                part_size,
                ..Default::default()
            },
        )
        .unwrap();
        let parts: Vec<_> = encoder
            .encode_buffer(&source)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();

        let decoder = Decoder::new(dir.path());
        let assembled = if parts.len() == 1 {
            decoder
                .decode_bytes(&parts[0].getvalue().unwrap())
                .unwrap()
                .unwrap()
        } else {
            let mut assembler = PartAssembler::new(dir.path());
            for part in &parts {
                let decoded = decoder
                    .decode_bytes(&part.getvalue().unwrap())
                    .unwrap()
                    .unwrap();
                assert!(decoded.is_valid(), "part {} should decode clean", decoded.part);
                assembler.add(decoded).unwrap();
            }
            assembler.assemble().unwrap()
        };

        assert_eq!(
            assembled.getvalue().unwrap(),
            payload,
            "round trip failed for len={} line_length={} part_size={:?}",
            len,
            line_length,
            part_size
        );
        assert!(assembled.is_valid());
    }
}

#[test]
fn fast_and_slow_paths_agree() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(42);
    let mut payload = vec![0u8; 8192];
    rng.fill_bytes(&mut payload);
    let source = binary(&payload, "dual.bin", dir.path());

    let encoder = Encoder::with_options(
        dir.path(),
        EncoderOptions {
            line_length: 128,
            part_size: Some(3000),
            ..Default::default()
        },
    )
    .unwrap();

    let fast: Vec<_> = encoder
        .clone()
        .fast_path(true)
        .encode_buffer(&source)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();
    let slow: Vec<_> = encoder
        .fast_path(false)
        .encode_buffer(&source)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    assert_eq!(fast.len(), slow.len());
    for (a, b) in fast.iter().zip(&slow) {
        assert_eq!(
            a.getvalue().unwrap(),
            b.getvalue().unwrap(),
            "encoder paths must emit identical framing"
        );
    }

    for part in &fast {
        let text = part.getvalue().unwrap();
        let with_fast = Decoder::new(dir.path())
            .fast_path(true)
            .decode_bytes(&text)
            .unwrap()
            .unwrap();
        let with_slow = Decoder::new(dir.path())
            .fast_path(false)
            .decode_bytes(&text)
            .unwrap()
            .unwrap();
        assert_eq!(with_fast.getvalue().unwrap(), with_slow.getvalue().unwrap());
        assert_eq!(with_fast.crc32(), with_slow.crc32());
    }
}

#[test]
fn spilled_buffers_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(7);
    let mut payload = vec![0u8; 3 * 512 * 1024];
    rng.fill_bytes(&mut payload);

    // force the source to spill early
    let mut source = ContentBuffer::with_threshold(ContentKind::Binary, dir.path(), 4096);
    source.filename = Some("big.bin".to_string());
    for chunk in payload.chunks(10_000) {
        source.append(chunk).unwrap();
    }
    source.finalize();
    assert!(source.backing_path().is_some());

    let encoded = Encoder::new(dir.path()).encode_single(&source).unwrap();
    // the ascii text is ~1.5 MiB, past the default threshold
    assert!(encoded.backing_path().is_some());

    let decoded = Decoder::new(dir.path())
        .decode_bytes(&encoded.getvalue().unwrap())
        .unwrap()
        .unwrap();
    let decoded_backing = decoded.backing_path().map(Path::to_path_buf);
    assert!(decoded_backing.as_deref().is_some_and(Path::exists));

    assert_eq!(decoded.getvalue().unwrap(), payload);
    assert!(decoded.is_valid());

    // dropping the buffers releases every temp file
    drop(decoded);
    assert!(!decoded_backing.unwrap().exists());
}

#[test]
fn encode_from_path_matches_buffer() {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let mut payload = vec![0u8; 2048];
    rng.fill_bytes(&mut payload);

    let file_path = dir.path().join("input.dat");
    std::fs::write(&file_path, &payload).unwrap();

    let encoder = Encoder::new(dir.path());
    let from_path = encoder.encode_path(&file_path).unwrap().next().unwrap().unwrap();

    let source = binary(&payload, "input.dat", dir.path());
    let from_buffer = encoder.encode_single(&source).unwrap();

    assert_eq!(
        from_path.getvalue().unwrap(),
        from_buffer.getvalue().unwrap()
    );
    let text = from_path.getvalue().unwrap();
    assert!(text.starts_with(b"=ybegin line=128 size=2048 name=input.dat\r\n"));
}
