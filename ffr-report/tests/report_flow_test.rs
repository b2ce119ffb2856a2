// 报告流程集成测试：从输入文件到全部 CSV 与 HTML 报告

use std::fs;
use std::path::Path;

use chrono::Local;
use ffr_parsers::fusedef::parse_fusedef_str;
use ffr_parsers::sspec::parse_sspec_reader;
use ffr_parsers::{
    parse_itf_directory, FleFuseSet, MtlOlfParser, SsidTable, UbeParser, UbeStats, VisualIdFilter,
};
use ffr_report::{
    build_breakdown, build_unit_data, check_units, echo, match_rows, naming, write_breakdown_csv,
    write_dff_csv, write_match_csv, write_unit_data_csv, HtmlReport,
};

const MTL_OLF: &str = r#"<Tokens>
    <Token dff_token_id="1" token_name="TOK_CORE" ref_level="CLASS" module="cpu">
        <field name="core" fuse_name="core" fuse_register="CPU0"/>
    </Token>
    <Token dff_token_id="2" token_name="TOK_RATIO" ref_level="CLASS" module="cpu">
        <field name="ratio" fuse_name="ratio_bits" fuse_register="CPU0"/>
    </Token>
</Tokens>"#;

const FUSEDEF: &str = r#"{"Registers": [{
    "RegistersData": [{"RegisterName": "CPU0"}],
    "FuseGroups": [
        {"Name": "core", "Fuses": [{"Name": "core_disable", "StartAddress": [0], "EndAddress": [7]}]},
        {"Name": "ratio", "Fuses": [{"Name": "ratio_bits", "StartAddress": [8], "EndAddress": [11]}]}
    ]}]}"#;

const ITF: &str = "\
3_lbeg
2_visualid_V1
2_tname_FACTFUSBURNCPUNOM_X_X_X_X_LOCKBIT_RAP_CPU0
2_strgalt_fus_msbF_0001010100100111
";

fn read_csv(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .unwrap()
        .trim_start_matches('\u{feff}')
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn test_full_report_flow() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    let out = output.path();
    let name = "fuse";

    let document = MtlOlfParser::new().parse_reader(MTL_OLF.as_bytes()).unwrap();
    let fuse_rows = parse_fusedef_str(FUSEDEF).unwrap();
    let records = UbeParser::new()
        .parse_reader("UNIT,V1\nCLASS,FT,TOK_CORE=39,TOK_RATIO=5\n".as_bytes())
        .unwrap();
    let qdfs = vec!["L0V8".to_string()];
    let entries = parse_sspec_reader(
        "FUSEDATA:CPU0:L0V8:x:0000mmmm00100111\nOTHER:line\n".as_bytes(),
        &qdfs,
    )
    .unwrap();

    let itf_dir = input.path().join("ituff");
    fs::create_dir(&itf_dir).unwrap();
    fs::write(itf_dir.join("unit.itf"), ITF).unwrap();
    let itf = parse_itf_directory(&itf_dir, &SsidTable::default(), &VisualIdFilter::All).unwrap();

    let mut html = HtmlReport::new(name);

    let path = naming::report_path(out, &naming::mtl_olf_echo(name));
    assert_eq!(echo::write_mtl_olf_csv(&path, &document.rows).unwrap(), 2);
    html.add_mtl_olf(&document.stats);
    html.add_output_file(&path);

    let path = naming::report_path(out, &naming::ube_echo("LOT9", "1234"));
    assert_eq!(echo::write_ube_csv(&path, &records).unwrap(), 2);
    html.add_ube(&UbeStats::from_records(&records));

    let (matches, match_stats) = match_rows(&document.rows, &fuse_rows);
    assert_eq!(match_stats.register_matches, 2);
    assert_eq!(match_stats.fusegroup_matches + match_stats.fusename_matches, 2);
    let path = naming::report_path(out, &naming::match_check(name));
    write_match_csv(&path, &matches).unwrap();
    html.add_match(&match_stats);

    let dff = check_units(&document.rows, &records);
    assert_eq!(dff.stats.total_missing, 0);
    let path = naming::report_path(out, &naming::dff_check(name));
    write_dff_csv(&path, &document.rows, &dff).unwrap();
    assert!(read_csv(&path)[1].ends_with(",39"));
    html.add_dff(&dff.stats);

    html.add_itf(&itf.stats);
    let breakdown = build_breakdown(&entries, &fuse_rows, &qdfs);
    let path = naming::report_path(out, &naming::sspec_breakdown(&qdfs, name));
    assert_eq!(write_breakdown_csv(&path, &breakdown).unwrap(), 2);
    assert!(path.ends_with("xsplit-sspec_L0V8_fuse.csv"));
    html.add_breakdown(&breakdown.stats);

    let table = itf.full_string_table();
    let units = build_unit_data(
        &breakdown,
        &table,
        &table.visual_ids(),
        Some(&dff.table),
        &FleFuseSet::new(),
    );
    let path = naming::report_path(out, &naming::unit_data(name));
    write_unit_data_csv(&path, &units).unwrap();
    let lines = read_csv(&path);
    assert_eq!(
        lines[0],
        "RegisterName,RegisterName_fuseDef,FuseGroup_Name_fuseDef,Fuse_Name_fuseDef,\
         StartAddress_fuseDef,EndAddress_fuseDef,bit_length,L0V8_binaryValue,L0V8_hexValue,\
         V1_ITF_binaryValue,V1_ITF_hexValue,V1_DFF_value,V1_StatusCheck"
    );
    assert_eq!(
        lines[1],
        "CPU0,CPU0,core,core_disable,0,7,8,b00100111,0X27,b00100111,0X27,39,dynamic"
    );
    assert_eq!(lines[2], "CPU0,CPU0,ratio,ratio_bits,8,11,4,bmmmm,Q,b0101,0X5,5,dynamic");
    assert_eq!(units.stats.status_counts["V1"]["dynamic"], 2);
    html.add_unit_data(&units.stats);

    let path = naming::report_path(out, &naming::html_statistics(name));
    html.write(&path, Local::now()).unwrap();
    let text = fs::read_to_string(&path).unwrap();
    assert_eq!(html.section_count(), 7);
    assert!(text.contains("<h2>sspec Register Statistics</h2>"));
    assert!(text.contains("<td>V1</td><td>0</td><td>0</td><td>2</td><td>0</td><td>0</td>"));
}
