use std::fs::{self, File};
use std::io::BufWriter;
use tsmux::format::ts::{AdaptationField, ElementaryStreamInfo, Muxer, PESHeader, StreamType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = "./test_output/output.ts";
    println!("Creating TS file with dummy video and audio streams...");
    println!("Will write to: {}", output_path);

    fs::create_dir_all("./test_output")?;

    let output_file = File::create(output_path)?;
    let writer = BufWriter::with_capacity(8192, output_file);
    let mut muxer = Muxer::new(writer);

    let video_pid =
        muxer.add_elementary_stream(ElementaryStreamInfo::new(0, StreamType::H264), true)?;
    let audio_pid = muxer.add_elementary_stream(ElementaryStreamInfo::new(0, StreamType::Aac), false)?;

    for i in 0..10u64 {
        let video_af = if i % 5 == 0 {
            Some(AdaptationField {
                random_access_indicator: true,
                ..Default::default()
            })
        } else {
            None
        };
        muxer.write_payload(
            video_pid,
            video_af,
            PESHeader::new(0).with_pts(i * 3600),
            &vec![0x00; 184],
        )?;

        muxer.write_payload(
            audio_pid,
            None,
            PESHeader::new(0).with_pts(i * 1200),
            &vec![0x00; 128],
        )?;
    }

    muxer.flush()?;
    println!("TS file created successfully at {}", output_path);
    Ok(())
}
